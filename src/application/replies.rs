//! 聊天回复文案

use crate::domain::playback::Track;

pub const HELP: &str = "**Commands**\n\
`play <query>` - play the best match or add it to the queue\n\
`search <query>` - list up to 10 matches, reply with a number to pick one\n\
`queue` - show the upcoming tracks\n\
`skip` - skip the current track\n\
`pause` / `resume` - pause or resume playback\n\
`stop` - stop playback and leave the voice channel\n\
`ping` - check that the bot is alive";

pub const PROVIDE_QUERY: &str = "Provide a song name.";
pub const JOIN_VOICE: &str = "Join a voice channel first.";
pub const BACKEND_NOT_READY: &str = "Audio backend is not ready.";
pub const NO_RESULTS: &str = "No results found.";
pub const UNEXPECTED: &str = "Error while playing track.";
pub const QUEUE_EMPTY: &str = "The queue is empty.";
pub const NOTHING_PLAYING: &str = "Nothing is playing.";
pub const STOPPED: &str = "Stopped playback and left the voice channel.";
pub const PAUSED: &str = "Paused.";
pub const RESUMED: &str = "Resumed.";
pub const ALREADY_PAUSED: &str = "Already paused.";
pub const NOT_PAUSED: &str = "Not paused.";
pub const SKIP_FAILED: &str = "Could not skip the track, playback has been stopped.";
pub const QUEUE_FINISHED: &str = "Skipped. The queue is finished, leaving the voice channel.";
pub const PLAYBACK_FAILED: &str = "Could not play the next track, playback has been stopped.";
pub const CHANNEL_EMPTY: &str = "Left the voice channel because everyone left.";

pub fn pong(latency_ms: i64) -> String {
    format!("Pong! Round-trip latency: {} ms", latency_ms)
}

pub fn now_playing(track: &Track) -> String {
    format!("🎵 Now playing: {}", track.title)
}

pub fn queued(track: &Track, position: usize) -> String {
    format!("Queued: {} (position {})", track.title, position)
}

pub fn skipped_to(track: &Track) -> String {
    format!("Skipped. Up next: {}", track.title)
}

pub fn search_results(query: &str, candidates: &[Track]) -> String {
    let mut text = format!("**Results for** `{}`:\n", query);
    for (i, track) in candidates.iter().enumerate() {
        text.push_str(&format!("{}. {}\n", i + 1, track.title));
    }
    text.push_str(&format!(
        "Reply with a number (1-{}) to pick a track.",
        candidates.len()
    ));
    text
}

pub fn queue_listing(current: Option<&Track>, upcoming: &[Track], total: usize) -> String {
    let mut text = String::new();
    if let Some(track) = current {
        text.push_str(&format!("**Now playing:** {}\n", track.title));
    }
    text.push_str("**Up next:**\n");
    for (i, track) in upcoming.iter().enumerate() {
        text.push_str(&format!("{}. {}\n", i + 1, track.title));
    }
    if total > upcoming.len() {
        text.push_str(&format!("...and {} more", total - upcoming.len()));
    }
    text.trim_end().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_results_are_numbered() {
        let tracks = vec![Track::new("A", "a"), Track::new("B", "b")];
        let text = search_results("jazz", &tracks);
        assert!(text.contains("1. A"));
        assert!(text.contains("2. B"));
        assert!(text.ends_with("(1-2) to pick a track."));
    }

    #[test]
    fn test_queue_listing_mentions_overflow() {
        let upcoming: Vec<Track> = (1..=10).map(|i| Track::new(format!("T{}", i), "x")).collect();
        let text = queue_listing(Some(&Track::new("Now", "x")), &upcoming, 12);
        assert!(text.starts_with("**Now playing:** Now"));
        assert!(text.contains("10. T10"));
        assert!(text.ends_with("...and 2 more"));
    }
}
