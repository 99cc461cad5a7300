use super::{Command, open_planet_store};
use crate::config::Config;
use crate::error::{Result, WrapErr};

pub struct ResetSubscriptionCommand {
    config: Config,
    id: String,
}

impl ResetSubscriptionCommand {
    pub fn new(cfg: Config, id: String) -> Self {
        Self { config: cfg, id }
    }
}

#[async_trait::async_trait]
impl Command for ResetSubscriptionCommand {
    async fn execute(&self) -> Result<()> {
        let store = open_planet_store(&self.config)?;
        let sub = planet::reset_subscription(&store, &self.id)
            .wrap_err_with(|| format!("Reset subscription {}", self.id))?;
        store.flush()?;
        println!("{} is active again: {}", sub.id, sub.url);
        Ok(())
    }
}
