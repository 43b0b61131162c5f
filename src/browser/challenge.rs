//! Bot challenge detection and best-effort evasion.

use std::time::Duration;

use chromiumoxide::Page;
use rand::Rng;
use tracing::{debug, info};

/// Interstitial pages that clear themselves once the browser "passes".
const INTERSTITIAL_SIGNALS: &[&str] = &[
    "checking your browser",
    "just a moment",
    "verifying you are human",
    "ddos protection",
];

/// Active challenges that want a human in the loop.
const CHALLENGE_SIGNALS: &[&str] = &[
    "captcha",
    "verify you are human",
    "are you a robot",
    "security check",
    "press & hold",
    "press and hold",
];

/// Hard blocks. Evasion rarely helps here but costs little to try.
const BLOCK_SIGNALS: &[&str] = &["access denied", "forbidden"];

const SNIPPET_CHARS: usize = 2000;

/// How long interstitials get to auto-solve before we intervene.
const AUTO_SOLVE_WAIT: Duration = Duration::from_secs(10);
const POST_ACTIVITY_WAIT: Duration = Duration::from_secs(5);

/// Simulated-activity grid over a typical above-the-fold region.
const GRID_ROWS: i64 = 4;
const GRID_COLS: i64 = 5;
const GRID_WIDTH: i64 = 1280;
const GRID_HEIGHT: i64 = 720;
const CLICK_PROBABILITY: f64 = 0.2;

/// Inspect the page title and the first part of the body text for the three
/// signal classes. Errors reading the page are treated as "no challenge";
/// subsequent extraction will fail louder on a genuinely broken page.
pub async fn detect_bot_challenge(page: &Page) -> bool {
    let probe = format!(
        r#"(() => {{
            const title = document.title || '';
            const body = (document.body && document.body.innerText)
                ? document.body.innerText.slice(0, {SNIPPET_CHARS})
                : '';
            return title + '\n' + body;
        }})()"#
    );

    let text = match page.evaluate(probe).await {
        Ok(value) => value.into_value::<String>().unwrap_or_default(),
        Err(e) => {
            debug!("Challenge probe failed: {}", e);
            return false;
        }
    };

    let haystack = text.to_lowercase();
    INTERSTITIAL_SIGNALS
        .iter()
        .chain(CHALLENGE_SIGNALS)
        .chain(BLOCK_SIGNALS)
        .any(|signal| haystack.contains(signal))
}

/// Try to clear a detected challenge. Waits out the auto-solve window, then
/// simulates cursor attention with occasional clicks and re-checks once.
/// Returns whether the page came back clean. Never loops; a false return
/// means the caller should skip the current target.
pub async fn attempt_evasion(page: &Page) -> bool {
    info!("Bot challenge detected, waiting for auto-solve");
    tokio::time::sleep(AUTO_SOLVE_WAIT).await;

    if !detect_bot_challenge(page).await {
        info!("Challenge cleared on its own");
        return true;
    }

    debug!("Challenge persists, simulating mouse activity");
    for (x, y, click, pause_ms) in activity_grid() {
        let _ = page
            .evaluate(format!("document.elementFromPoint({x}, {y})?.tagName"))
            .await;
        if click {
            let _ = page.evaluate(click_script(x, y)).await;
        }
        tokio::time::sleep(Duration::from_millis(pause_ms)).await;
    }

    tokio::time::sleep(POST_ACTIVITY_WAIT).await;
    let cleared = !detect_bot_challenge(page).await;
    if cleared {
        info!("Challenge cleared after simulated activity");
    } else {
        info!("Challenge did not clear, giving up on this page");
    }
    cleared
}

/// Grid cell centers with positional jitter, a click roll per cell, and a
/// human-ish pause. Built up front so the thread-local RNG never crosses an
/// await point.
fn activity_grid() -> Vec<(i64, i64, bool, u64)> {
    let mut rng = rand::rng();
    let mut cells = Vec::with_capacity((GRID_ROWS * GRID_COLS) as usize);

    for row in 0..GRID_ROWS {
        for col in 0..GRID_COLS {
            let x = col * (GRID_WIDTH / GRID_COLS)
                + GRID_WIDTH / (GRID_COLS * 2)
                + rng.random_range(-40..=40);
            let y = row * (GRID_HEIGHT / GRID_ROWS)
                + GRID_HEIGHT / (GRID_ROWS * 2)
                + rng.random_range(-40..=40);
            cells.push((
                x.max(1),
                y.max(1),
                rng.random_bool(CLICK_PROBABILITY),
                rng.random_range(80..220),
            ));
        }
    }

    cells
}

fn click_script(x: i64, y: i64) -> String {
    format!(
        r#"(() => {{
            const el = document.elementFromPoint({x}, {y});
            if (!el) return false;
            const opts = {{ bubbles: true, cancelable: true, view: window, clientX: {x}, clientY: {y} }};
            el.dispatchEvent(new MouseEvent('mousedown', opts));
            el.dispatchEvent(new MouseEvent('mouseup', opts));
            el.dispatchEvent(new MouseEvent('click', opts));
            return true;
        }})()"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_covers_every_cell_with_sane_coordinates() {
        let cells = activity_grid();
        assert_eq!(cells.len(), (GRID_ROWS * GRID_COLS) as usize);
        for (x, y, _, pause) in cells {
            assert!(x >= 1 && x <= GRID_WIDTH + 40);
            assert!(y >= 1 && y <= GRID_HEIGHT + 40);
            assert!((80..220).contains(&pause));
        }
    }

    #[test]
    fn click_script_embeds_coordinates() {
        let script = click_script(640, 360);
        assert!(script.contains("elementFromPoint(640, 360)"));
        assert!(script.contains("clientX: 640"));
    }
}
