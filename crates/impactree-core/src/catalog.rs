//! Charity categories and charities.

use serde::Deserialize;
use sqlx::PgPool;
use tracing::info;

use impactree_db::models::{Charity, CharityCategory, User};
use impactree_db::queries::charities::{self as charity_queries, CharityFields};
use impactree_db::queries::categories as category_queries;

use crate::auth::require_staff;
use crate::error::{ImpactError, Result};
use crate::fields::{double_option, require_non_empty};
use crate::media::{ImageValue, MediaStore, parse_image_value};
use crate::view::{CharityView, charity_view, charity_views};

/// Directory under the media root holding charity images.
pub const CHARITY_IMAGE_DIR: &str = "charity_images";

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
}

pub async fn create_category(pool: &PgPool, input: &CategoryInput) -> Result<CharityCategory> {
    require_non_empty("name", &input.name)?;
    let category = category_queries::insert_category(pool, input.name.trim()).await?;
    info!(category_id = category.id, name = %category.name, "category created");
    Ok(category)
}

pub async fn get_category(pool: &PgPool, id: i64) -> Result<CharityCategory> {
    category_queries::get_category(pool, id)
        .await?
        .ok_or_else(|| ImpactError::not_found("category", id))
}

pub async fn list_categories(pool: &PgPool) -> Result<Vec<CharityCategory>> {
    Ok(category_queries::list_categories(pool).await?)
}

pub async fn update_category(pool: &PgPool, id: i64, input: &CategoryInput) -> Result<CharityCategory> {
    require_non_empty("name", &input.name)?;
    let category = category_queries::update_category(pool, id, input.name.trim())
        .await?
        .ok_or_else(|| ImpactError::not_found("category", id))?;
    info!(category_id = id, "category updated");
    Ok(category)
}

/// Delete a category. Its charities stay, uncategorized.
pub async fn delete_category(pool: &PgPool, id: i64) -> Result<()> {
    if !category_queries::delete_category(pool, id).await? {
        return Err(ImpactError::not_found("category", id));
    }
    info!(category_id = id, "category deleted");
    Ok(())
}

// ---------------------------------------------------------------------------
// Charities
// ---------------------------------------------------------------------------

/// Write payload for a charity.
///
/// `category` and `image` distinguish an absent key (keep) from `null`
/// (clear).
#[derive(Debug, Clone, Deserialize)]
pub struct CharityInput {
    pub name: String,
    pub description: String,
    pub impact_metric: String,
    pub impact_ratio: f64,
    pub website_url: String,
    #[serde(default, deserialize_with = "double_option")]
    pub category: Option<Option<i64>>,
    #[serde(default, deserialize_with = "double_option")]
    pub image: Option<Option<String>>,
}

impl CharityInput {
    fn validate(&self) -> Result<()> {
        require_non_empty("name", &self.name)?;
        require_non_empty("impact_metric", &self.impact_metric)?;
        if !self.impact_ratio.is_finite() {
            return Err(ImpactError::validation("impact_ratio must be a finite number"));
        }
        Ok(())
    }
}

async fn check_category(pool: &PgPool, category_id: Option<i64>) -> Result<()> {
    let Some(id) = category_id else {
        return Ok(());
    };
    if category_queries::get_category(pool, id).await?.is_none() {
        return Err(ImpactError::not_found("category", id));
    }
    Ok(())
}

/// Outcome of applying an image value against the currently stored path.
struct ImageChange {
    path: Option<String>,
    /// Newly written file, removed again if the row write fails.
    written: Option<String>,
}

async fn apply_image(
    media: &MediaStore,
    requested: &Option<Option<String>>,
    current: Option<&str>,
) -> Result<ImageChange> {
    let keep = || ImageChange {
        path: current.map(str::to_owned),
        written: None,
    };
    match requested {
        None => Ok(keep()),
        Some(None) => Ok(ImageChange {
            path: None,
            written: None,
        }),
        Some(Some(value)) => match parse_image_value(value)? {
            // A stored reference only ever keeps the row's own file; a row
            // without one never takes over another charity's image.
            ImageValue::Stored(_) => Ok(keep()),
            ImageValue::Upload(image) => {
                let path = media.save(CHARITY_IMAGE_DIR, &image).await?;
                Ok(ImageChange {
                    path: Some(path.clone()),
                    written: Some(path),
                })
            }
        },
    }
}

fn fields<'a>(input: &'a CharityInput, category_id: Option<i64>, image_path: Option<&'a str>) -> CharityFields<'a> {
    CharityFields {
        name: input.name.trim(),
        description: &input.description,
        impact_metric: &input.impact_metric,
        impact_ratio: input.impact_ratio,
        website_url: &input.website_url,
        category_id,
        image_path,
    }
}

pub async fn create_charity(
    pool: &PgPool,
    media: &MediaStore,
    caller: &User,
    input: &CharityInput,
) -> Result<CharityView> {
    require_staff(caller)?;
    input.validate()?;
    let category_id = input.category.flatten();
    check_category(pool, category_id).await?;

    let image = apply_image(media, &input.image, None).await?;
    let inserted =
        charity_queries::insert_charity(pool, &fields(input, category_id, image.path.as_deref())).await;
    let charity = match inserted {
        Ok(charity) => charity,
        Err(e) => {
            if let Some(path) = &image.written {
                media.discard(path).await;
            }
            return Err(e.into());
        }
    };

    info!(charity_id = charity.id, name = %charity.name, by = caller.id, "charity created");
    charity_view(pool, charity).await
}

pub async fn get_charity(pool: &PgPool, id: i64) -> Result<CharityView> {
    let charity = charity_queries::get_charity(pool, id)
        .await?
        .ok_or_else(|| ImpactError::NotFound("Charity not found".into()))?;
    charity_view(pool, charity).await
}

pub async fn list_charities(pool: &PgPool) -> Result<Vec<CharityView>> {
    let charities = charity_queries::list_charities(pool).await?;
    charity_views(pool, charities).await
}

async fn load_charity(pool: &PgPool, id: i64) -> Result<Charity> {
    charity_queries::get_charity(pool, id)
        .await?
        .ok_or_else(|| ImpactError::NotFound("Charity not found".into()))
}

pub async fn update_charity(
    pool: &PgPool,
    media: &MediaStore,
    caller: &User,
    id: i64,
    input: &CharityInput,
) -> Result<CharityView> {
    require_staff(caller)?;
    input.validate()?;
    let existing = load_charity(pool, id).await?;

    let category_id = match input.category {
        None => existing.category_id,
        Some(requested) => requested,
    };
    check_category(pool, category_id).await?;

    let image = apply_image(media, &input.image, existing.image_path.as_deref()).await?;
    let updated =
        charity_queries::update_charity(pool, id, &fields(input, category_id, image.path.as_deref()))
            .await;
    let charity = match updated {
        Ok(Some(charity)) => charity,
        Ok(None) => {
            if let Some(path) = &image.written {
                media.discard(path).await;
            }
            return Err(ImpactError::NotFound("Charity not found".into()));
        }
        Err(e) => {
            if let Some(path) = &image.written {
                media.discard(path).await;
            }
            return Err(e.into());
        }
    };

    if let Some(old) = existing.image_path.as_deref() {
        if charity.image_path.as_deref() != Some(old) {
            media.discard(old).await;
        }
    }

    info!(charity_id = id, by = caller.id, "charity updated");
    charity_view(pool, charity).await
}

/// Delete a charity along with every allocation to it.
pub async fn delete_charity(pool: &PgPool, media: &MediaStore, caller: &User, id: i64) -> Result<()> {
    require_staff(caller)?;
    let existing = load_charity(pool, id).await?;
    if !charity_queries::delete_charity(pool, id).await? {
        return Err(ImpactError::NotFound("Charity not found".into()));
    }
    if let Some(path) = existing.image_path.as_deref() {
        media.discard(path).await;
    }
    info!(charity_id = id, by = caller.id, "charity deleted");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(image: Option<Option<String>>) -> CharityInput {
        CharityInput {
            name: "Food Bank".into(),
            description: String::new(),
            impact_metric: "meals".into(),
            impact_ratio: 3.0,
            website_url: String::new(),
            category: None,
            image,
        }
    }

    #[tokio::test]
    async fn absent_image_keeps_current() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::new(dir.path());
        let change = apply_image(&media, &None, Some("charity_images/a.png")).await.unwrap();
        assert_eq!(change.path.as_deref(), Some("charity_images/a.png"));
        assert!(change.written.is_none());
    }

    #[tokio::test]
    async fn null_image_clears() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::new(dir.path());
        let change = apply_image(&media, &Some(None), Some("charity_images/a.png")).await.unwrap();
        assert!(change.path.is_none());
    }

    #[tokio::test]
    async fn media_url_keeps_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::new(dir.path());
        let requested = Some(Some("/media/charity_images/other.png".to_owned()));
        let change = apply_image(&media, &requested, Some("charity_images/a.png")).await.unwrap();
        assert_eq!(change.path.as_deref(), Some("charity_images/a.png"));
    }

    #[tokio::test]
    async fn media_url_without_current_image_stores_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::new(dir.path());
        let requested = Some(Some("/media/charity_images/other.png".to_owned()));
        let change = apply_image(&media, &requested, None).await.unwrap();
        assert!(change.path.is_none());
        assert!(change.written.is_none());
    }

    #[tokio::test]
    async fn upload_is_written_under_charity_images() {
        let dir = tempfile::tempdir().unwrap();
        let media = MediaStore::new(dir.path());
        let requested = Some(Some("data:image/jpeg;base64,aGVsbG8=".to_owned()));
        let change = apply_image(&media, &requested, None).await.unwrap();
        let path = change.written.unwrap();
        assert!(path.starts_with("charity_images/") && path.ends_with(".jpeg"));
        assert!(dir.path().join(&path).exists());
    }

    #[test]
    fn validation_rejects_blank_name_and_nan_ratio() {
        let mut bad = input(None);
        bad.name = " ".into();
        assert!(bad.validate().is_err());
        let mut bad = input(None);
        bad.impact_ratio = f64::NAN;
        assert!(bad.validate().is_err());
        assert!(input(None).validate().is_ok());
    }

    #[test]
    fn payload_distinguishes_null_category() {
        let json = r#"{"name":"A","description":"","impact_metric":"m","impact_ratio":1.5,
                       "website_url":"","category":null}"#;
        let parsed: CharityInput = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.category, Some(None));
        assert_eq!(parsed.image, None);
    }
}
