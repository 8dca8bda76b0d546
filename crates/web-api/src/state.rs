use std::sync::Arc;

use application::{EventSubscriber, RoomService};

#[derive(Clone)]
pub struct AppState {
    pub room_service: Arc<RoomService>,
    pub subscriber: Arc<dyn EventSubscriber>,
}

impl AppState {
    pub fn new(room_service: Arc<RoomService>, subscriber: Arc<dyn EventSubscriber>) -> Self {
        Self {
            room_service,
            subscriber,
        }
    }
}
