use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// How dark a coffee is roasted. Non-coffee items still carry one.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum RoastLevel {
    Light,
    Medium,
    Dark,
}

impl RoastLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RoastLevel::Light => "Light",
            RoastLevel::Medium => "Medium",
            RoastLevel::Dark => "Dark",
        }
    }
}

impl fmt::Display for RoastLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for RoastLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "light" => Ok(RoastLevel::Light),
            "medium" => Ok(RoastLevel::Medium),
            "dark" => Ok(RoastLevel::Dark),
            _ => Err(format!(
                "Invalid roast level: '{}'. Valid values: Light, Medium, Dark",
                s
            )),
        }
    }
}

/// Storefront category a product is listed under.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Category {
    Coffee,
    Equipment,
    Merch,
}

impl Category {
    pub fn all() -> &'static [Category] {
        &[Category::Coffee, Category::Equipment, Category::Merch]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Coffee => "Coffee",
            Category::Equipment => "Equipment",
            Category::Merch => "Merch",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "coffee" => Ok(Category::Coffee),
            "equipment" => Ok(Category::Equipment),
            "merch" => Ok(Category::Merch),
            _ => Err(format!(
                "Invalid category: '{}'. Valid values: Coffee, Equipment, Merch",
                s
            )),
        }
    }
}

/// A catalog entry. `price` is in the shop's currency unit (VND), no decimals.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    pub name: String,
    pub price: u64,
    pub description: String,
    pub origin: String,
    pub notes: Vec<String>,
    pub roast_level: RoastLevel,
    pub image_url: String,
    pub category: Category,
}

impl Product {
    /// Creates a product with a freshly assigned id.
    ///
    /// Ids are UUID v4 strings so a deleted product's id is never handed out again.
    pub fn new(name: impl Into<String>, price: u64, category: Category) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            price,
            description: String::new(),
            origin: String::new(),
            notes: Vec::new(),
            roast_level: RoastLevel::Medium,
            image_url: String::new(),
            category,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    pub fn with_notes(mut self, notes: Vec<String>) -> Self {
        self.notes = notes;
        self
    }

    pub fn with_roast_level(mut self, roast_level: RoastLevel) -> Self {
        self.roast_level = roast_level;
        self
    }

    pub fn with_image_url(mut self, image_url: impl Into<String>) -> Self {
        self.image_url = image_url.into();
        self
    }
}

impl fmt::Display for Product {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", "=".repeat(self.name.chars().count()))?;
        writeln!(f, "ID: {}", self.id)?;
        writeln!(f, "Category: {}", self.category)?;
        writeln!(f, "Price: {}", self.price)?;
        if !self.origin.is_empty() {
            writeln!(f, "Origin: {}", self.origin)?;
        }
        if self.category == Category::Coffee {
            writeln!(f, "Roast: {}", self.roast_level)?;
        }
        if !self.notes.is_empty() {
            writeln!(f, "Notes: {}", self.notes.join(", "))?;
        }
        if !self.description.is_empty() {
            writeln!(f, "\n{}", self.description)?;
        }
        Ok(())
    }
}

/// Products in `category`, or all of them when `category` is `None`.
pub fn filter_by_category(products: &[Product], category: Option<Category>) -> Vec<&Product> {
    products
        .iter()
        .filter(|p| category.map_or(true, |c| p.category == c))
        .collect()
}
