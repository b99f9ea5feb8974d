use clb_core::{
    domain::Amount,
    errors::Error,
    formatting::escape_html,
    menu::{menu_keyboard, menu_text, DEFAULT_USER_NAME},
    messaging::types::LinkKeyboard,
    overlay::OverlayEvent,
    security::is_admin,
    store::MAX_PRICE,
};

use super::Incoming;
use crate::router::AppState;

const HELP_TEXT: &str = "👋 <b>Willkommen zur Live-Show!</b>

/menu – Preisliste mit Bezahl-Buttons
/status – Status der Show

<b>Admin:</b>
/liveon – Show-Hinweise in diesem Chat starten
/liveoff – Show-Hinweise stoppen
/addprice &lt;Betrag&gt; &lt;Name&gt; – Preis anlegen oder ändern
/delprice &lt;Name&gt; – Preis löschen
/setmodel &lt;Name&gt; – Model-Namen setzen
/marketingon, /marketingoff – Werbung an/aus
/addadmin &lt;ID&gt; – Admin hinzufügen
/say &lt;Text&gt; – Text im Overlay anzeigen";

const NOT_ADMIN: &str = "⛔ Nur Admins dürfen diesen Befehl benutzen.";
const SAVE_FAILED: &str = "❌ Speichern fehlgeschlagen. Details im Log.";

/// What to send back to the chat.
#[derive(Clone, Debug, PartialEq)]
pub enum Reply {
    None,
    Html(String),
    Keyboard { html: String, keyboard: LinkKeyboard },
}

impl Reply {
    fn html(s: impl Into<String>) -> Self {
        Self::Html(s.into())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Start,
    Menu,
    Status,
    LiveOn,
    LiveOff,
    AddPrice(String),
    DelPrice(String),
    SetModel(String),
    MarketingOn,
    MarketingOff,
    AddAdmin(String),
    Say(String),
    Unknown(String),
}

impl Command {
    pub fn parse(text: &str) -> Self {
        let (cmd, _, args) = parse_command(text);
        match cmd.as_str() {
            "start" | "help" => Self::Start,
            "menu" => Self::Menu,
            "status" => Self::Status,
            "liveon" => Self::LiveOn,
            "liveoff" => Self::LiveOff,
            "addprice" => Self::AddPrice(args),
            "delprice" => Self::DelPrice(args),
            "setmodel" => Self::SetModel(args),
            "marketingon" => Self::MarketingOn,
            "marketingoff" => Self::MarketingOff,
            "addadmin" => Self::AddAdmin(args),
            "say" => Self::Say(args),
            _ => Self::Unknown(cmd),
        }
    }

    pub fn admin_only(&self) -> bool {
        !matches!(
            self,
            Self::Start | Self::Menu | Self::Status | Self::Unknown(_)
        )
    }
}

/// Split `/cmd@botname arg1 ...` into command (lowercased), addressee and arguments.
fn parse_command(text: &str) -> (String, Option<String>, String) {
    let mut parts = text.trim().splitn(2, char::is_whitespace);
    let first = parts.next().unwrap_or("").trim();
    let rest = parts.next().unwrap_or("").trim().to_string();

    let (cmd, target) = match first.trim_start_matches('/').split_once('@') {
        Some((cmd, bot)) => (cmd, Some(bot.to_string())),
        None => (first.trim_start_matches('/'), None),
    };

    (cmd.to_lowercase(), target, rest)
}

/// `/cmd@OtherBot` in a group is meant for someone else.
fn addressed_elsewhere(text: &str, me: Option<&str>) -> bool {
    let (_, target, _) = parse_command(text);
    match (target, me) {
        (Some(target), Some(me)) => !target.eq_ignore_ascii_case(me),
        _ => false,
    }
}

/// `<amount> <name…>`, or `<name…> <amount>` as a fallback.
fn parse_price_args(args: &str) -> Option<(Amount, String)> {
    let args = args.trim();
    let (head, tail) = args.split_once(char::is_whitespace)?;
    if let Some(amount) = Amount::parse(head) {
        return Some((amount, tail.trim().to_string()));
    }
    let (name, last) = args.rsplit_once(char::is_whitespace)?;
    Amount::parse(last).map(|amount| (amount, name.trim().to_string()))
}

pub async fn handle_command(state: &AppState, incoming: &Incoming) -> Reply {
    if addressed_elsewhere(&incoming.text, state.bot_username.as_deref()) {
        tracing::debug!(chat_id = incoming.chat_id.0, "command for another bot ignored");
        return Reply::None;
    }

    let cmd = Command::parse(&incoming.text);
    tracing::info!(
        chat_id = incoming.chat_id.0,
        user_id = incoming.user_id.map(|u| u.0),
        command = ?cmd,
        "command received"
    );

    if cmd.admin_only() && !is_admin(incoming.user_id, &state.admins().await) {
        return Reply::html(NOT_ADMIN);
    }

    execute(state, incoming, cmd).await
}

pub async fn execute(state: &AppState, incoming: &Incoming, cmd: Command) -> Reply {
    let chat_id = incoming.chat_id;

    match cmd {
        Command::Start => Reply::html(HELP_TEXT),

        Command::Menu => {
            let data = state.store.snapshot().await;
            let html = menu_text(&data);
            let user_name = if incoming.first_name.trim().is_empty() {
                DEFAULT_USER_NAME
            } else {
                incoming.first_name.as_str()
            };
            match menu_keyboard(&data, &state.cfg.public_base_url, chat_id, user_name) {
                Ok(keyboard) if keyboard.is_empty() => Reply::Html(html),
                Ok(keyboard) => Reply::Keyboard { html, keyboard },
                Err(e) => {
                    tracing::error!(error = %e, "failed to build menu buttons");
                    Reply::Html(html)
                }
            }
        }

        Command::Status => {
            let data = state.store.snapshot().await;
            let active = state.announcer.active_chats().await;
            let here = state.announcer.is_active(chat_id).await;
            let on_off = |b: bool| if b { "an" } else { "aus" };
            Reply::Html(format!(
                "📊 <b>Status</b>\nModel: {}\nLive: {}\nMarketing: {}\nPreise: {}\nAktive Chats: {}\nHinweise in diesem Chat: {}\nHinweis-Intervall: {}s",
                escape_html(&data.model_name),
                on_off(data.live),
                on_off(data.marketing_on),
                data.prices.len(),
                active.len(),
                on_off(here),
                state.announcer.interval().as_secs(),
            ))
        }

        Command::LiveOn => {
            if let Err(e) = state
                .store
                .update(|d| {
                    d.mark_live(chat_id);
                    Ok(())
                })
                .await
            {
                return store_error(e);
            }
            state.announcer.start(chat_id).await;
            let model = state.store.snapshot().await.model_name;
            state.overlay.publish(OverlayEvent::Notice {
                text: format!("{model} ist jetzt LIVE!"),
            });
            Reply::html("🔔 Automatische Show-Hinweise wurden in diesem Chat AKTIVIERT.")
        }

        Command::LiveOff => {
            state.announcer.stop(chat_id).await;
            if let Err(e) = state
                .store
                .update(|d| {
                    d.mark_offline(chat_id);
                    Ok(())
                })
                .await
            {
                return store_error(e);
            }
            Reply::html("🔕 Automatische Show-Hinweise wurden in diesem Chat DEAKTIVIERT.")
        }

        Command::AddPrice(args) => {
            let Some((amount, name)) = parse_price_args(&args) else {
                return Reply::html(format!(
                    "Benutzung: /addprice &lt;Betrag&gt; &lt;Name&gt;\nBeispiel: /addprice 7,50 Cute Emoji\nMaximal {MAX_PRICE} EUR."
                ));
            };
            match state.store.update(|d| d.upsert_price(&name, amount)).await {
                Ok(replaced) => {
                    let verb = if replaced { "aktualisiert" } else { "hinzugefügt" };
                    Reply::html(format!(
                        "✅ Preis {verb}: <b>{}</b> – {amount} EUR",
                        escape_html(name.trim())
                    ))
                }
                Err(e) => store_error(e),
            }
        }

        Command::DelPrice(name) => {
            if name.is_empty() {
                return Reply::html("Benutzung: /delprice &lt;Name&gt;");
            }
            let removed = state
                .store
                .update(|d| {
                    let stored = d.find_price(&name).map(|p| p.name.clone());
                    d.remove_price(&name);
                    Ok(stored)
                })
                .await;
            match removed {
                Ok(Some(stored)) => {
                    Reply::html(format!("🗑 Preis gelöscht: <b>{}</b>", escape_html(&stored)))
                }
                Ok(None) => Reply::html(format!(
                    "Kein Preis mit dem Namen <b>{}</b> gefunden.",
                    escape_html(&name)
                )),
                Err(e) => store_error(e),
            }
        }

        Command::SetModel(name) => match state.store.update(|d| d.set_model_name(&name)).await {
            Ok(()) => Reply::html(format!(
                "✅ Model-Name gesetzt: <b>{}</b>",
                escape_html(name.trim())
            )),
            Err(Error::InvalidInput(_)) => Reply::html("Benutzung: /setmodel &lt;Name&gt;"),
            Err(e) => store_error(e),
        },

        Command::MarketingOn | Command::MarketingOff => {
            let on = matches!(cmd, Command::MarketingOn);
            if let Err(e) = state
                .store
                .update(|d| {
                    d.marketing_on = on;
                    Ok(())
                })
                .await
            {
                return store_error(e);
            }
            if on {
                Reply::html("📣 Marketing-Hinweise sind AN.")
            } else {
                Reply::html("🔇 Marketing-Hinweise sind AUS.")
            }
        }

        Command::AddAdmin(arg) => {
            let Ok(id) = arg.trim().parse::<i64>() else {
                return Reply::html("Benutzung: /addadmin &lt;Telegram-ID&gt;");
            };
            match state.store.update(|d| Ok(d.add_admin(id))).await {
                Ok(true) => Reply::html(format!("✅ Admin hinzugefügt: <code>{id}</code>")),
                Ok(false) => Reply::html(format!("<code>{id}</code> ist bereits Admin.")),
                Err(e) => store_error(e),
            }
        }

        Command::Say(text) => {
            if text.is_empty() {
                return Reply::html("Benutzung: /say &lt;Text&gt;");
            }
            let delivered = state.overlay.publish(OverlayEvent::Notice { text });
            Reply::html(format!("📺 An das Overlay gesendet ({delivered} verbunden)."))
        }

        Command::Unknown(cmd) => {
            tracing::debug!(command = %cmd, "unknown command");
            Reply::html("Unbekannter Befehl. Tippe /start für eine Übersicht.")
        }
    }
}

fn store_error(e: Error) -> Reply {
    match e {
        Error::InvalidInput(msg) => Reply::Html(format!("⚠️ {}", escape_html(&msg))),
        other => {
            tracing::error!(error = %other, "failed to save show data");
            Reply::html(SAVE_FAILED)
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::handlers::test_support::{message, Harness, ADMIN, CHAT};

    const GUEST: i64 = 99;

    #[test]
    fn parse_command_splits_bot_suffix_and_lowercases() {
        assert_eq!(
            parse_command("/AddPrice@LiveBot 5 Cute Emoji"),
            (
                "addprice".to_string(),
                Some("LiveBot".to_string()),
                "5 Cute Emoji".to_string()
            )
        );
        assert_eq!(
            parse_command("/menu"),
            ("menu".to_string(), None, String::new())
        );
    }

    #[test]
    fn suffix_must_name_this_bot() {
        assert!(addressed_elsewhere("/menu@SomeOtherBot", Some("LiveBot")));
        assert!(!addressed_elsewhere("/menu@livebot", Some("LiveBot")));
        assert!(!addressed_elsewhere("/menu", Some("LiveBot")));
        assert!(!addressed_elsewhere("/menu@SomeOtherBot", None));
    }

    #[tokio::test]
    async fn commands_for_other_bots_are_ignored() {
        let h = Harness::new().await;
        assert_eq!(
            handle_command(&h.state, &message(GUEST, "/ban@ModeratorBot 123")).await,
            Reply::None
        );
        assert_eq!(
            handle_command(&h.state, &message(GUEST, "/menu@SomeOtherBot")).await,
            Reply::None
        );
        assert_eq!(
            handle_command(&h.state, &message(ADMIN, "/setmodel@SomeOtherBot Eve")).await,
            Reply::None
        );
        assert_eq!(h.state.store.snapshot().await.model_name, "Model");

        assert!(matches!(
            handle_command(&h.state, &message(GUEST, "/menu@LiveBot")).await,
            Reply::Keyboard { .. }
        ));
    }

    #[test]
    fn command_parse_and_permissions() {
        assert_eq!(Command::parse("/help"), Command::Start);
        assert_eq!(Command::parse("/say hi there"), Command::Say("hi there".into()));
        assert_eq!(Command::parse("/nope"), Command::Unknown("nope".into()));
        assert!(!Command::Menu.admin_only());
        assert!(Command::LiveOn.admin_only());
        assert!(Command::AddAdmin(String::new()).admin_only());
    }

    #[test]
    fn price_args_in_either_order() {
        assert_eq!(
            parse_price_args("7,50 Cute Emoji"),
            Some((Amount::from_cents(750), "Cute Emoji".into()))
        );
        assert_eq!(
            parse_price_args("Song Request 20"),
            Some((Amount::from_units(20), "Song Request".into()))
        );
        assert_eq!(parse_price_args("Cute Emoji"), None);
        assert_eq!(parse_price_args("12"), None);
    }

    #[tokio::test]
    async fn admin_commands_refuse_guests() {
        let h = Harness::new().await;
        let reply = handle_command(&h.state, &message(GUEST, "/addprice 5 Wink")).await;
        assert_eq!(reply, Reply::html(NOT_ADMIN));
        assert!(h.state.store.snapshot().await.find_price("Wink").is_none());
    }

    #[tokio::test]
    async fn no_configured_admins_refuses_everyone() {
        let mut h = Harness::new().await;
        let mut cfg = (*h.state.cfg).clone();
        cfg.admin_ids.clear();
        h.state.cfg = std::sync::Arc::new(cfg);

        let reply = handle_command(&h.state, &message(ADMIN, "/setmodel Luna")).await;
        assert_eq!(reply, Reply::html(NOT_ADMIN));
    }

    #[tokio::test]
    async fn stored_admins_are_honored() {
        let h = Harness::new().await;
        handle_command(&h.state, &message(ADMIN, "/addadmin 42")).await;
        let reply = handle_command(&h.state, &message(42, "/setmodel Luna")).await;
        assert!(matches!(reply, Reply::Html(s) if s.contains("Luna")));
        assert_eq!(h.state.store.snapshot().await.model_name, "Luna");
    }

    #[tokio::test]
    async fn menu_has_one_button_per_price() {
        let h = Harness::new().await;
        let Reply::Keyboard { html, keyboard } =
            handle_command(&h.state, &message(GUEST, "/menu")).await
        else {
            panic!("expected keyboard reply");
        };
        assert!(html.contains("Menü der Show"));
        assert_eq!(keyboard.buttons.len(), 7);
        let url = keyboard.buttons[0].url.as_str();
        assert!(url.starts_with("https://live.test/donar?"));
        assert!(url.contains("user_name=Ann"));
        assert!(url.contains(&format!("chat_id={}", CHAT.0)));
    }

    #[tokio::test]
    async fn menu_without_prices_has_no_buttons() {
        let h = Harness::new().await;
        h.state
            .store
            .update(|d| {
                d.prices.clear();
                Ok(())
            })
            .await
            .unwrap();
        let reply = handle_command(&h.state, &message(GUEST, "/menu")).await;
        assert!(matches!(reply, Reply::Html(s) if s.contains("Noch keine Preise")));
    }

    #[tokio::test]
    async fn addprice_and_delprice() {
        let h = Harness::new().await;
        let reply = handle_command(&h.state, &message(ADMIN, "/addprice 7,5 Feet <3")).await;
        assert!(matches!(&reply, Reply::Html(s) if s.contains("hinzugefügt") && s.contains("Feet &lt;3") && s.contains("7.50")));

        let reply = handle_command(&h.state, &message(ADMIN, "/addprice 9 feet <3")).await;
        assert!(matches!(&reply, Reply::Html(s) if s.contains("aktualisiert")));
        assert_eq!(
            h.state.store.snapshot().await.find_price("FEET <3").unwrap().price,
            Amount::from_units(9)
        );

        let reply = handle_command(&h.state, &message(ADMIN, "/delprice FEET <3")).await;
        assert!(matches!(&reply, Reply::Html(s) if s.contains("gelöscht: <b>feet &lt;3</b>")));
        let reply = handle_command(&h.state, &message(ADMIN, "/delprice Feet <3")).await;
        assert!(matches!(&reply, Reply::Html(s) if s.contains("Kein Preis")));
    }

    #[tokio::test]
    async fn addprice_rejects_out_of_range() {
        let h = Harness::new().await;
        let reply = handle_command(&h.state, &message(ADMIN, "/addprice 20000 Car")).await;
        assert!(matches!(&reply, Reply::Html(s) if s.starts_with("⚠️")));
        let reply = handle_command(&h.state, &message(ADMIN, "/addprice abc")).await;
        assert!(matches!(&reply, Reply::Html(s) if s.starts_with("Benutzung")));
    }

    #[tokio::test(start_paused = true)]
    async fn liveon_and_liveoff_drive_announcer_and_store() {
        let h = Harness::new().await;
        let reply = handle_command(&h.state, &message(ADMIN, "/liveon")).await;
        assert!(matches!(&reply, Reply::Html(s) if s.contains("AKTIVIERT")));

        let data = h.state.store.snapshot().await;
        assert!(data.live);
        assert_eq!(data.live_chats, vec![CHAT]);
        assert_eq!(h.state.announcer.active_chats().await, vec![CHAT]);
        let status = handle_command(&h.state, &message(GUEST, "/status")).await;
        assert!(matches!(&status, Reply::Html(s) if s.contains("Hinweise in diesem Chat: an")));

        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(h.messenger.sends.lock().unwrap().len(), 1);

        let reply = handle_command(&h.state, &message(ADMIN, "/liveoff")).await;
        assert!(matches!(&reply, Reply::Html(s) if s.contains("DEAKTIVIERT")));
        assert!(!h.state.store.snapshot().await.live);
        assert!(h.state.announcer.active_chats().await.is_empty());
    }

    #[tokio::test]
    async fn marketing_off_is_persisted() {
        let h = Harness::new().await;
        handle_command(&h.state, &message(ADMIN, "/marketingoff")).await;
        assert!(!h.state.store.snapshot().await.marketing_on);
        handle_command(&h.state, &message(ADMIN, "/marketingon")).await;
        assert!(h.state.store.snapshot().await.marketing_on);

        let reopened = clb_core::store::Store::open(h.state.store.path()).await.unwrap();
        assert!(reopened.snapshot().await.marketing_on);
    }

    #[tokio::test]
    async fn say_publishes_overlay_notice() {
        let h = Harness::new().await;
        let mut rx = h.state.overlay.subscribe();
        let reply = handle_command(&h.state, &message(ADMIN, "/say Gleich geht's los")).await;
        assert!(matches!(&reply, Reply::Html(s) if s.contains("1 verbunden")));
        let msg = rx.recv().await.unwrap();
        assert_eq!(
            msg.event,
            OverlayEvent::Notice {
                text: "Gleich geht's los".into()
            }
        );
    }

    #[tokio::test]
    async fn status_and_unknown() {
        let h = Harness::new().await;
        let reply = handle_command(&h.state, &message(GUEST, "/status")).await;
        assert!(matches!(&reply, Reply::Html(s) if s.contains("Preise: 7") && s.contains("Marketing: an")));
        assert!(matches!(&reply, Reply::Html(s) if s.contains("Hinweise in diesem Chat: aus")));
        let reply = handle_command(&h.state, &message(GUEST, "/whatever")).await;
        assert!(matches!(&reply, Reply::Html(s) if s.contains("/start")));
    }
}
