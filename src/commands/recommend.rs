use clap::Args;
use std::sync::Arc;

use crate::config::Config;
use crate::recommend::{GeminiRecommender, Recommender};
use crate::repository::ContentRepository;
use crate::session::ContentStore;

#[derive(Args)]
pub struct RecommendCommand {
    /// What you like in a coffee (e.g. "fruity and bright")
    #[arg(required = true)]
    pub preference: Vec<String>,
}

impl RecommendCommand {
    pub async fn run(
        &self,
        repository: Arc<dyn ContentRepository>,
        config: &Config,
    ) -> Result<(), Box<dyn std::error::Error>> {
        // Recommend from the live catalog, or the bundled one if it cannot be read
        let store = ContentStore::open(repository).await;
        let document = store.document();

        let recommender = GeminiRecommender::new(&config.recommend, config.request_timeout())?
            .with_shop_name(document.site.site.title.clone());
        let preference = self.preference.join(" ");

        let text = recommender
            .recommend(&preference, &document.products)
            .await;
        println!("{}", text);
        Ok(())
    }
}
