use crate::config::Config;
use crate::feed_hub::FeedHub;
use crate::push::PushSender;
use crate::store::DocumentStore;
use actix::Addr;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn DocumentStore>,
    pub push: Arc<dyn PushSender>,
    pub feed: Addr<FeedHub>,
    pub config: Config,
}
