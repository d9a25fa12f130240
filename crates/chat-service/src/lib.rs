//! # chat-service
//!
//! Application layer between the gateway and the collaborators: credential
//! authentication, room join authorization, the validate → persist → latest
//! pointer send pipeline, read receipts, and the wire DTOs shared with clients.

pub mod dto;
pub mod services;

pub use services::{
    AuthService, DeliveredMessage, ErrorCategory, MessageService, ReadService, RoomService,
    ServiceContext, ServiceContextBuilder, ServiceError, ServiceResult,
};
