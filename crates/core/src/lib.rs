//! Core booking engine for contested sports-center court slots.
//!
//! Slots at the supported municipal portals open for reservation at a
//! known instant and are gone within seconds. This crate provides the
//! pieces a run is composed of: a portal client driven over an automated
//! browser ([`SportsCenterClient`]), the immutable per-site data that
//! parameterizes it ([`SiteDescriptor`]), a sub-second precision
//! countdown ([`countdown`]), and the concurrent per-slot dispatcher
//! ([`BookingDispatcher`]).
//!
//! The phases of a run are strictly linear; only dispatch fans out.

pub mod client;
pub mod countdown;
pub mod dispatch;
pub mod error;
pub mod session;
pub mod site;
pub mod slot;

pub use client::SportsCenterClient;
pub use countdown::wait_until;
pub use dispatch::BookingDispatcher;
pub use error::{ClientError, DispatchError};
pub use session::{AuthenticatedSession, Credentials};
pub use site::{BookingOutcome, SiteDescriptor, ZHONGSHAN, ZHONGZHENG};
pub use slot::BookingSlot;
