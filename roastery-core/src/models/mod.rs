mod document;
mod navigation;
mod product;
mod site;

pub use document::{ContentDocument, ContentFile, DocumentError};
pub use navigation::NavLink;
pub use product::{filter_by_category, Category, Product, RoastLevel};
pub use site::{CallToAction, Hero, SiteContent, SiteMeta, LINE_BREAK_MARKER};
