//! Immutable per-site configuration.
//!
//! Every supported portal runs the same control flow; the sites differ
//! only in selectors, URL encoding, and two literal marker substrings.
//! All of that is data here, so adding a portal is a new descriptor, not
//! new code.

use crate::error::DispatchError;
use crate::slot::BookingSlot;

/// DOM locators for the shared login flow.
#[derive(Debug)]
pub struct Locators {
    /// Element showing the logged-in member's name; its presence confirms
    /// authentication.
    pub welcome_name: &'static str,
    /// Disclaimer checkbox that must be ticked before submitting.
    pub disclaimer_checkbox: &'static str,
    pub username_input: &'static str,
    pub password_input: &'static str,
    /// Element carrying the portal's login-failure message.
    pub login_failed: &'static str,
}

/// Marker confirming return to the anonymous state after logout.
#[derive(Debug)]
pub struct LoggedOutMarker {
    pub selector: &'static str,
    pub text: &'static str,
}

#[derive(Debug)]
pub struct SiteDescriptor {
    pub name: &'static str,
    pub login_url: &'static str,
    /// Page the booking query string is appended to.
    pub booking_base: &'static str,
    pub facility_id: u32,
    /// Whether `QTime` is zero-padded to two digits. Fixed per site.
    pub pad_hour: bool,
    /// Number of modal dialogs the portal throws up before login.
    pub pre_login_dialogs: u8,
    /// In-page script that triggers credential submission; these portals
    /// do not use a plain form POST.
    pub submit_script: &'static str,
    /// Script that clicks the portal's logout control.
    pub logout_script: &'static str,
    pub logged_out: LoggedOutMarker,
    pub success_marker: &'static str,
    pub failure_marker: &'static str,
    pub locators: Locators,
}

/// Outcome of one booking attempt. An unmatched body is an error
/// ([`DispatchError::UnrecognizedResponse`]), never a third variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingOutcome {
    Success,
    Failure,
}

impl SiteDescriptor {
    /// Builds the exact booking request URL for `slot`.
    ///
    /// Month and day are always zero-padded; hour padding is per-site.
    /// The slot's own validation guarantees the components are in range.
    pub fn booking_url(&self, slot: &BookingSlot) -> String {
        let hour = if self.pad_hour {
            format!("{:02}", slot.hour())
        } else {
            slot.hour().to_string()
        };
        format!(
            "{base}?module=net_booking&files=booking_place&StepFlag=25&QPid={pid}&QTime={hour}&PT=1&D={y}/{m:02}/{d:02}",
            base = self.booking_base,
            pid = self.facility_id,
            y = slot.year(),
            m = slot.month(),
            d = slot.day(),
        )
    }

    /// Classifies a booking response body by its embedded redirect
    /// parameters. The two markers are the entire outcome contract.
    pub fn classify(&self, body: &str) -> Result<BookingOutcome, DispatchError> {
        if body.contains(self.success_marker) {
            Ok(BookingOutcome::Success)
        } else if body.contains(self.failure_marker) {
            Ok(BookingOutcome::Failure)
        } else {
            Err(DispatchError::UnrecognizedResponse {
                snippet: body.chars().take(200).collect(),
            })
        }
    }
}

/// 中山運動中心 (Zhongshan Sports Center).
pub static ZHONGSHAN: SiteDescriptor = SiteDescriptor {
    name: "中山運動中心",
    login_url: "https://scr.cyc.org.tw/tp01.aspx?module=login_page&files=login",
    booking_base: "https://scr.cyc.org.tw/tp01.aspx",
    facility_id: 84,
    pad_hour: true,
    pre_login_dialogs: 2,
    submit_script: "DoSubmit()",
    logout_script: LOGOUT_BY_SPAN_TEXT,
    logged_out: LoggedOutMarker {
        selector: "#member_login",
        text: "會員註冊/登入",
    },
    success_marker: "PT=1&X=1",
    failure_marker: "PT=1&X=2",
    locators: Locators {
        welcome_name: "#lab_Name",
        disclaimer_checkbox: ".swal2-actions",
        username_input: "#ContentPlaceHolder1_loginid",
        password_input: "#loginpw",
        login_failed: "#showerror3",
    },
};

/// 中正運動中心 (Zhongzheng Sports Center). Same flow, different host,
/// facility id, and an unpadded hour in the booking URL.
pub static ZHONGZHENG: SiteDescriptor = SiteDescriptor {
    name: "中正運動中心",
    login_url: "https://bwd.xuanen.com.tw/wd27.aspx?module=login_page&files=login",
    booking_base: "https://bwd.xuanen.com.tw/wd27.aspx",
    facility_id: 1199,
    pad_hour: false,
    pre_login_dialogs: 2,
    submit_script: "DoSubmit()",
    logout_script: LOGOUT_BY_SPAN_TEXT,
    logged_out: LoggedOutMarker {
        selector: "#member_login",
        text: "會員註冊/登入",
    },
    success_marker: "PT=1&X=1",
    failure_marker: "PT=1&X=2",
    locators: Locators {
        welcome_name: "#lab_Name",
        disclaimer_checkbox: ".swal2-actions",
        username_input: "#ContentPlaceHolder1_loginid",
        password_input: "#loginpw",
        login_failed: "#showerror3",
    },
};

// Both portals render logout as an <a> wrapping a span with the literal
// text [登出]; CSS alone cannot match on text.
const LOGOUT_BY_SPAN_TEXT: &str = "(() => { \
    const link = Array.from(document.querySelectorAll('a')).find(a => { \
        const span = a.querySelector('span'); \
        return span && span.textContent.trim() === '[登出]'; \
    }); \
    if (!link) throw new Error('logout link not found'); \
    link.click(); })()";
