//! Seller-side product management and the public catalog.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, instrument, warn};

use crate::domain::{DomainEvent, NewProduct, Price, Product, ProductError, ProductEvent};
use crate::error::{MarketplaceError, Result};
use crate::media::MediaStore;
use crate::publisher::EventPublisher;
use crate::repository::ProductRepository;

/// An uploaded image as received from the client.
#[derive(Debug, Clone)]
pub struct ImageUpload {
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct ProductDraft {
    pub name: String,
    pub description: String,
    pub price: Decimal,
    pub image: Option<ImageUpload>,
}

pub struct CatalogService {
    products: Arc<dyn ProductRepository>,
    media: Arc<MediaStore>,
    events: EventPublisher,
}

impl CatalogService {
    pub fn new(products: Arc<dyn ProductRepository>, media: Arc<MediaStore>, events: EventPublisher) -> Self {
        Self { products, media, events }
    }

    #[instrument(name = "catalog::create", skip(self, draft), fields(name = %draft.name), err(Display))]
    pub async fn create(&self, seller_id: i64, draft: ProductDraft) -> Result<Product> {
        let price = Price::new(draft.price)?;
        let mut new = NewProduct::new(seller_id, &draft.name, &draft.description, price, None)?;
        if let Some(image) = &draft.image {
            new.image_path = Some(self.media.save(image.content_type.as_deref(), &image.bytes).await?);
        }
        let stored_image = new.image_path.clone();
        let product = match self.products.insert(new).await {
            Ok(p) => p,
            Err(e) => {
                if let Some(path) = stored_image {
                    self.media.remove(&path).await;
                }
                return Err(e);
            }
        };
        info!(product_id = product.id, "product created");
        self.events.publish(DomainEvent::product_created(&product)).await;
        Ok(product)
    }

    #[instrument(name = "catalog::update_price", skip(self), err(Display))]
    pub async fn update_price(&self, seller_id: i64, product_id: i64, new_price: Decimal) -> Result<Product> {
        let price = Price::new(new_price)?;
        let current = self.owned(seller_id, product_id).await?;
        let product = self.products.update_price(product_id, seller_id, price).await?.ok_or(ProductError::NotOwner)?;
        self.events
            .publish(DomainEvent::Product(ProductEvent::PriceChanged {
                product_id, old_price: current.price.amount(), new_price: product.price.amount(),
            }))
            .await;
        Ok(product)
    }

    #[instrument(name = "catalog::update_description", skip(self, description), err(Display))]
    pub async fn update_description(&self, seller_id: i64, product_id: i64, description: &str) -> Result<Product> {
        let description = description.trim();
        if description.is_empty() {
            return Err(MarketplaceError::InvalidInput("description is required".to_string()));
        }
        self.owned(seller_id, product_id).await?;
        let product = self.products.update_description(product_id, seller_id, description).await?;
        Ok(product.ok_or(ProductError::NotOwner)?)
    }

    /// Stores the new image, points the product at it, then drops the old file.
    #[instrument(name = "catalog::update_image", skip(self, image), err(Display))]
    pub async fn update_image(&self, seller_id: i64, product_id: i64, image: ImageUpload) -> Result<Product> {
        let current = self.owned(seller_id, product_id).await?;
        let path = self.media.save(image.content_type.as_deref(), &image.bytes).await?;
        let updated = match self.products.update_image(product_id, seller_id, Some(&path)).await {
            Ok(Some(p)) => p,
            Ok(None) => {
                self.media.remove(&path).await;
                return Err(ProductError::NotOwner.into());
            }
            Err(e) => {
                self.media.remove(&path).await;
                return Err(e);
            }
        };
        if let Some(old) = current.image_path {
            self.media.remove(&old).await;
        }
        Ok(updated)
    }

    #[instrument(name = "catalog::delete", skip(self), err(Display))]
    pub async fn delete(&self, seller_id: i64, product_id: i64) -> Result<()> {
        let current = self.owned(seller_id, product_id).await?;
        if !self.products.delete(product_id, seller_id).await? {
            return Err(ProductError::NotOwner.into());
        }
        if let Some(path) = &current.image_path {
            self.media.remove(path).await;
        }
        info!("product deleted");
        self.events.publish(DomainEvent::Product(ProductEvent::Deleted { product_id, seller_id })).await;
        Ok(())
    }

    pub async fn list_all(&self) -> Result<Vec<Product>> { self.products.list_all().await }

    pub async fn list_by_seller(&self, seller_id: i64) -> Result<Vec<Product>> { self.products.list_by_seller(seller_id).await }

    /// Absent and foreign products are both reported as `Forbidden`.
    async fn owned(&self, seller_id: i64, product_id: i64) -> Result<Product> {
        let Some(product) = self.products.find(product_id).await? else {
            warn!(product_id, "product missing for seller mutation");
            return Err(ProductError::NotOwner.into());
        };
        product.ensure_owned_by(seller_id).map_err(MarketplaceError::from)?;
        Ok(product)
    }
}
