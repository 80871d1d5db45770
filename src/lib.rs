//! Referral Engine - reward computation and campaign lifecycle
//!
//! Computes referral rewards for qualifying transactions, tracks caps and
//! idempotency, drives the campaign and reward moderation state machines,
//! and keeps an audit trail committed with every mutation.

pub mod auth;
pub mod clock;
pub mod config;
pub mod error;
pub mod facade;
pub mod interfaces;
pub mod model;
pub mod services;
pub mod storage;
pub mod utils;
pub mod validation;

pub use auth::{Actor, Permission, Role};
pub use error::{EngineError, ErrorKind, FieldError, FieldErrors, Result};
pub use facade::{ReferralEngine, ReferralEngineBuilder};
