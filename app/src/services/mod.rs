pub mod http;
pub mod image_cache;
pub mod message_parser;
