//! Concurrent per-slot booking dispatch.
//!
//! The portal grants whichever request it receives first among all
//! contestants, so every slot's GET is started at once; any ordering
//! would only lose races. One result is recorded per slot and nothing
//! is ever retried: a retry would land after the window has closed to
//! other contestants.

use std::collections::HashMap;

use futures::future::join_all;
use reqwest::header::COOKIE;
use tracing::{info, warn};

use crate::error::{ClientError, DispatchError};
use crate::session::AuthenticatedSession;
use crate::site::{BookingOutcome, SiteDescriptor};
use crate::slot::BookingSlot;

pub struct BookingDispatcher {
    site: &'static SiteDescriptor,
    http: reqwest::Client,
}

impl BookingDispatcher {
    /// Builds the dispatcher's HTTP client.
    ///
    /// Certificate verification is relaxed; these municipal portals run
    /// with chains that do not always validate.
    pub fn new(site: &'static SiteDescriptor) -> Result<Self, DispatchError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()?;
        Ok(Self { site, http })
    }

    /// Fires one booking request per slot, all concurrently, and returns
    /// each slot's classified outcome.
    ///
    /// The session is read-only here and shared by every request. A
    /// failed slot never cancels or delays its siblings, and no error
    /// escapes past its own slot's entry.
    pub async fn dispatch(
        &self,
        session: &AuthenticatedSession,
        slots: &[BookingSlot],
    ) -> Result<HashMap<BookingSlot, Result<BookingOutcome, DispatchError>>, ClientError> {
        let cookie_header = session.cookie_header()?;

        let attempts = slots.iter().map(|slot| {
            let cookie_header = cookie_header.as_str();
            async move { (*slot, self.book_one(cookie_header, *slot).await) }
        });

        Ok(join_all(attempts).await.into_iter().collect())
    }

    async fn book_one(
        &self,
        cookie_header: &str,
        slot: BookingSlot,
    ) -> Result<BookingOutcome, DispatchError> {
        info!(target = "courtsnipe.dispatch", %slot, "搶 {slot} 的場地");

        let url = self.site.booking_url(&slot);
        let body = self
            .http
            .get(&url)
            .header(COOKIE, cookie_header)
            .send()
            .await?
            .text()
            .await?;

        let outcome = self.site.classify(&body)?;
        match outcome {
            BookingOutcome::Success => {
                info!(target = "courtsnipe.dispatch", %slot, "{slot} 的場地預約成功")
            }
            BookingOutcome::Failure => {
                warn!(target = "courtsnipe.dispatch", %slot, "{slot} 的場地預約失敗")
            }
        }
        Ok(outcome)
    }
}
