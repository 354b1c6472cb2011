// Copyright 2019-2026 Maravilla Labs, operated by SOLUTAS GmbH, Switzerland
// SPDX-License-Identifier: Apache-2.0
// SPDX-License-Identifier: MIT

//! WebSocket handler and client script for live reload.

use axum::extract::ws::{Message, WebSocket};
use specview::ReloadEvent;
use tokio::sync::broadcast;

/// Path of the reload WebSocket.
pub const LIVERELOAD_PATH: &str = "/__livereload";

/// Forwards reload events to one browser until it disconnects.
///
/// `Notify` events are dropped when `notify` is false.
pub async fn handle_websocket(
    mut socket: WebSocket,
    mut rx: broadcast::Receiver<ReloadEvent>,
    notify: bool,
) {
    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(ReloadEvent::Notify { .. }) if !notify => continue,
                    Ok(event) => {
                        if socket.send(Message::Text(event.to_json())).await.is_err() {
                            // Client disconnected
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "live reload client lagged");
                        continue;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }
}

/// Inserts the live reload client into an HTML page.
///
/// `page_url` is the URL the page was generated for; reloads announced for
/// other pages are ignored by the client.
pub fn inject_livereload_script(html: &str, page_url: &str) -> String {
    let page = serde_json::to_string(page_url)
        .unwrap_or_else(|_| "\"/\"".to_string())
        .replace("</", "<\\/");
    let script = CLIENT_SCRIPT
        .replace("%specview.page%", &page)
        .replace("%specview.socket%", LIVERELOAD_PATH);

    // ASCII lowercasing keeps byte offsets valid for the original string.
    let lower = html.to_ascii_lowercase();
    if let Some(pos) = lower.rfind("</body>").or_else(|| lower.rfind("</html>")) {
        let mut result = String::with_capacity(html.len() + script.len());
        result.push_str(&html[..pos]);
        result.push_str(&script);
        result.push_str(&html[pos..]);
        result
    } else {
        format!("{}{}", html, script)
    }
}

const CLIENT_SCRIPT: &str = r#"
<script>
(function() {
    var page = %specview.page%;
    var protocol = window.location.protocol === 'https:' ? 'wss:' : 'ws:';
    var isPage = /(\.html?|\.bs|\.dot|\/)$/;
    var banner = null;
    var hideTimer = null;

    function show(text) {
        if (!banner) {
            banner = document.createElement('div');
            banner.style.cssText = 'position:fixed;top:0;right:0;z-index:99999;padding:12px 16px;' +
                'background:#1a1a1a;color:#fff;font:14px/1.4 monospace;border-bottom-left-radius:5px;';
            document.body.appendChild(banner);
        }
        banner.textContent = text;
        banner.style.display = 'block';
        clearTimeout(hideTimer);
        hideTimer = setTimeout(function() { banner.style.display = 'none'; }, 2000);
    }

    function connect() {
        var ws = new WebSocket(protocol + '//' + window.location.host + '%specview.socket%');
        ws.onmessage = function(event) {
            var msg;
            try { msg = JSON.parse(event.data); } catch (e) { return; }
            if (msg.type === 'notify') {
                show(msg.message);
            } else if (msg.type === 'reload') {
                if (!msg.url || msg.url === page || !isPage.test(msg.url)) {
                    console.log('[specview] Reloading...');
                    window.location.reload();
                }
            }
        };
        ws.onclose = function() {
            console.log('[specview] Connection lost, reconnecting...');
            setTimeout(connect, 1000);
        };
    }

    connect();
})();
</script>
"#;
