//! One full race, end to end.
//!
//! The phases are strictly linear: collect and confirm parameters, log
//! in, hold at the safety checkpoint, capture cookies, hold until the
//! market-open instant, then fan out one request per slot. The browser
//! is released on every exit path once acquired.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Local, TimeZone};
use courtsnipe::client::SportsCenterClient;
use courtsnipe::countdown;
use courtsnipe::dispatch::BookingDispatcher;
use courtsnipe::session::{AuthenticatedSession, Credentials};
use courtsnipe::site::{BookingOutcome, SiteDescriptor};
use courtsnipe::slot::BookingSlot;
use tracing::{error, info};

use crate::cli::Cli;
use crate::{input, schedule};

struct RunPlan {
    site: &'static SiteDescriptor,
    open_at: DateTime<Local>,
    login_margin: Duration,
    slots: Vec<BookingSlot>,
}

pub async fn execute(cli: Cli) -> Result<()> {
    let plan = build_plan(&cli)?;
    let Some(credentials) = collect_credentials(&plan)? else {
        info!(target = "courtsnipe", "預約資訊不正確，終止程式");
        return Ok(());
    };

    let mut client = SportsCenterClient::connect(plan.site).await?;
    let raced = race(&mut client, &credentials, &plan).await;
    // Guaranteed release of the automated browser, success or not.
    client.close();
    raced
}

fn build_plan(cli: &Cli) -> Result<RunPlan> {
    let site = cli.site.descriptor();
    let now = Local::now().naive_local();

    let open_at = match cli.open_at.as_deref() {
        Some(text) => input::parse_future_datetime(text, now)?,
        None => schedule::next_open_instant(now, cli.weekday)?,
    };
    let slot_times = match cli.slots.as_deref() {
        Some(text) => input::parse_booking_periods(text, now)?,
        None => schedule::default_slot_times(open_at),
    };
    let slots = slot_times
        .into_iter()
        .map(BookingSlot::from_datetime)
        .collect();

    let open_at = Local
        .from_local_datetime(&open_at)
        .single()
        .context("open instant is ambiguous in the local timezone")?;

    Ok(RunPlan {
        site,
        open_at,
        login_margin: Duration::seconds(cli.login_margin_secs),
        slots,
    })
}

/// Prompts for credentials and a final confirmation of the assembled
/// plan. Returns `None` when the operator rejects the plan.
fn collect_credentials(plan: &RunPlan) -> Result<Option<Credentials>> {
    let username = input::prompt("請輸入你的身分證字號：")?;
    let password = input::prompt_password("請輸入密碼：")?;

    println!();
    println!("場館：{}", plan.site.name);
    println!("預定開搶時間：{}", plan.open_at.format("%Y-%m-%d %H:%M:%S"));
    let windows: Vec<String> = plan.slots.iter().map(ToString::to_string).collect();
    println!("預計預約時段:{}", windows.join(" & "));

    if !input::confirm("請確認以上搶球場資訊是否正確？ Y/N：")? {
        return Ok(None);
    }

    Ok(Some(Credentials { username, password }))
}

async fn race(
    client: &mut SportsCenterClient,
    credentials: &Credentials,
    plan: &RunPlan,
) -> Result<()> {
    let mut session = client.login(credentials).await?;

    // Logout is attempted whether the remaining phases conclude or fail;
    // only a failed login skips it.
    let outcome = hold_and_dispatch(client, &session, plan).await;
    client.logout(&mut session).await;
    outcome
}

async fn hold_and_dispatch(
    client: &SportsCenterClient,
    session: &AuthenticatedSession,
    plan: &RunPlan,
) -> Result<()> {
    // Hold at the safety checkpoint so the captured cookies are fresh
    // when the race starts; the countdown always displays true
    // time-to-open.
    let checkpoint = plan.open_at - plan.login_margin;
    countdown::wait_until(checkpoint, plan.open_at).await;

    let cookie_count = client.cookies(session)?.len();
    info!(target = "courtsnipe", cookie_count, "session cookies captured");

    let dispatcher = BookingDispatcher::new(plan.site)?;
    countdown::wait_until(plan.open_at, plan.open_at).await;

    let results = dispatcher.dispatch(session, &plan.slots).await?;

    let mut won = 0usize;
    for (slot, result) in &results {
        match result {
            Ok(BookingOutcome::Success) => won += 1,
            Ok(BookingOutcome::Failure) => {}
            Err(e) => error!(target = "courtsnipe", %slot, error = %e, "slot not classified"),
        }
    }
    info!(
        target = "courtsnipe",
        won,
        total = results.len(),
        "race finished"
    );

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration as StdDuration;

    use cdp::Page;
    use cdp::connection::CdpConnection;
    use cdp::transport::fake::{FakeTransportController, fake_transport};
    use courtsnipe::site::{Locators, LoggedOutMarker};
    use serde_json::{Value, json};

    fn local_site() -> &'static SiteDescriptor {
        Box::leak(Box::new(SiteDescriptor {
            name: "本機測試場館",
            login_url: "http://127.0.0.1:1/",
            booking_base: "http://127.0.0.1:1/",
            facility_id: 84,
            pad_hour: true,
            pre_login_dialogs: 0,
            submit_script: "DoSubmit()",
            logout_script: "window.__logout()",
            logged_out: LoggedOutMarker {
                selector: "#member_login",
                text: "會員註冊/登入",
            },
            success_marker: "PT=1&X=1",
            failure_marker: "PT=1&X=2",
            locators: Locators {
                welcome_name: "#lab_Name",
                disclaimer_checkbox: ".swal2-actions",
                username_input: "#loginid",
                password_input: "#loginpw",
                login_failed: "#showerror3",
            },
        }))
    }

    fn scripted_client(
        site: &'static SiteDescriptor,
        behave: impl Fn(&str, &Value) -> Value + Send + Sync + 'static,
    ) -> (SportsCenterClient, Arc<FakeTransportController>) {
        let (parts, controller) = fake_transport();
        let (connection, event_rx) = CdpConnection::new(parts);

        let conn = Arc::clone(&connection);
        tokio::spawn(async move { conn.run().await });

        let controller = Arc::new(controller);
        let responder = Arc::clone(&controller);
        tokio::spawn(async move {
            let mut answered = 0usize;
            loop {
                let sent = responder.sent_messages().await;
                while answered < sent.len() {
                    let message = &sent[answered];
                    let id = message["id"].as_u64().expect("requests carry ids") as u32;
                    let method = message["method"].as_str().unwrap_or_default();
                    responder.inject_response(id, behave(method, &message["params"]));
                    answered += 1;
                }
                tokio::time::sleep(StdDuration::from_millis(5)).await;
            }
        });

        let client = SportsCenterClient::from_page(site, Page::new(connection, event_rx));
        (client, controller)
    }

    #[tokio::test(start_paused = true)]
    async fn race_attempts_logout_before_returning() {
        let site = local_site();
        let (mut client, controller) = scripted_client(site, |method, params| {
            let expression = params["expression"].as_str().unwrap_or_default();
            match method {
                "Network.getCookies" => json!({
                    "cookies": [{ "name": "ASP.NET_SessionId", "value": "abc123" }]
                }),
                "Runtime.evaluate" if expression.contains("#lab_Name") => {
                    json!({ "result": { "type": "string", "value": "王小明" } })
                }
                _ => json!({}),
            }
        });

        let plan = RunPlan {
            site,
            open_at: Local::now() - Duration::seconds(5),
            login_margin: Duration::seconds(0),
            slots: Vec::new(),
        };
        let credentials = Credentials {
            username: "A123456789".to_string(),
            password: "secret".to_string(),
        };

        race(&mut client, &credentials, &plan).await.unwrap();

        // Every post-login outcome funnels through the same logout call;
        // the portal must have been asked to log out before race returned.
        let sent = controller.sent_messages().await;
        let logout_sent = sent.iter().any(|message| {
            message["method"] == "Runtime.evaluate"
                && message["params"]["expression"].as_str() == Some(site.logout_script)
        });
        assert!(logout_sent, "race returned without attempting logout");
    }
}
