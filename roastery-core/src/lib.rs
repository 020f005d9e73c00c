//! Roastery Core Library
//!
//! Content model, path editing and cart logic shared by the admin tools and
//! the content API.

pub mod cart;
pub mod models;
pub mod path;

pub use cart::{Cart, CartItem};
pub use models::{
    filter_by_category, CallToAction, Category, ContentDocument, ContentFile, DocumentError, Hero,
    NavLink, Product, RoastLevel, SiteContent, SiteMeta,
};
pub use path::{Path, PathError, PathErrorReason, PathParseError, PathSegment, ShapeMismatch};

pub fn version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
