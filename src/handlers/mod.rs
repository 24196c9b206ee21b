//! HTTP handlers for generated table CRUD and the metadata/enum read APIs.

pub mod crud;
pub mod metadata;
