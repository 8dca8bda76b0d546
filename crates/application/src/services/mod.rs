mod room_service;

pub use room_service::{
    DeleteMessageRequest, EditMessageRequest, JoinRoomRequest, PostMessageRequest, RoomService,
    RoomServiceDependencies,
};
