//! Merging polled and pushed playback data into [`MediaState`]
//!
//! Everything here is a pure function of its inputs and an explicit `now`,
//! so the engine decides when to poll and the rules stay testable.

use std::time::Duration;

use chrono::{DateTime, Utc};
use quick_xml::events::Event;
use quick_xml::Reader;
use tracing::trace;

use sonos_api::{Favorite, MediaInfo, TrackInfo};

use crate::model::{DeviceState, MediaKind, MediaState, PositionRecord, TransportState};

/// URI schemes of broadcast streams
const RADIO_SCHEMES: [&str; 5] = [
    "x-rincon-mp3radio:",
    "x-sonosapi-stream:",
    "x-sonosapi-radio:",
    "x-sonosapi-hls:",
    "hls-radio:",
];

/// Values devices use for "not reported"
fn is_unset(value: &str) -> bool {
    value.is_empty() || value == "NOT_IMPLEMENTED"
}

pub fn is_radio_uri(uri: &str) -> bool {
    RADIO_SCHEMES.iter().any(|scheme| uri.starts_with(scheme))
}

/// Parse an `H:MM:SS` or `H:MM:SS.mmm` time span
pub fn parse_timespan(span: Option<&str>) -> Option<Duration> {
    let span = span?.trim();
    if is_unset(span) {
        return None;
    }

    let parts: Vec<&str> = span.split(':').collect();
    if parts.len() != 3 {
        return None;
    }

    let hours: u64 = parts[0].parse().ok()?;
    let minutes: u64 = parts[1].parse().ok()?;

    let (secs, millis) = match parts[2].split_once('.') {
        Some((secs, frac)) => {
            let frac: String = frac.chars().chain("000".chars()).take(3).collect();
            (secs.parse::<u64>().ok()?, frac.parse::<u64>().ok()?)
        }
        None => (parts[2].parse::<u64>().ok()?, 0),
    };

    // Device-reported; anything that overflows is garbage
    let total_secs = hours
        .checked_mul(3600)?
        .checked_add(minutes.checked_mul(60)?)?
        .checked_add(secs)?;
    Some(Duration::from_millis(
        total_secs.checked_mul(1000)?.checked_add(millis)?,
    ))
}

/// `dc:title` of a DIDL-Lite document
pub fn didl_title(metadata: &str) -> Option<String> {
    if is_unset(metadata) {
        return None;
    }

    let mut reader = Reader::from_str(metadata);
    reader.trim_text(true);

    let mut in_title = false;
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => in_title = e.local_name().as_ref() == b"title",
            Ok(Event::Text(text)) if in_title => {
                let title = text.unescape().ok()?.into_owned();
                return if is_unset(&title) { None } else { Some(title) };
            }
            Ok(Event::End(_)) => in_title = false,
            Ok(Event::Eof) => return None,
            Ok(_) => {}
            Err(e) => {
                trace!("Unreadable DIDL metadata: {}", e);
                return None;
            }
        }
    }
}

/// Whether a fresh position report should overwrite the record
///
/// True when the device stopped or started reporting a position, when the
/// transport state changed, or when the report differs from the
/// extrapolated position by more than `threshold`.
pub fn should_update_position(
    record: Option<&PositionRecord>,
    reported: Option<Duration>,
    state_changed: bool,
    now: DateTime<Utc>,
    threshold: Duration,
) -> bool {
    if state_changed {
        return true;
    }
    match (record, reported) {
        (None, None) => false,
        (Some(_), None) | (None, Some(_)) => true,
        (Some(record), Some(reported)) => {
            let expected = record.extrapolate(now).as_secs_f64();
            (expected - reported.as_secs_f64()).abs() > threshold.as_secs_f64()
        }
    }
}

/// Media data polled for one reconcile pass
#[derive(Debug, Clone)]
pub enum MediaPoll {
    /// Hardware input; carries its label
    LineIn(String),
    Radio {
        track: TrackInfo,
        media: MediaInfo,
        /// "On Now" text from the triggering event, if any
        radio_show: Option<String>,
    },
    Track(TrackInfo),
}

/// Drift correction settings
#[derive(Debug, Clone, Copy)]
pub struct Reconciler {
    drift_threshold: Duration,
}

impl Reconciler {
    pub fn new(drift_threshold: Duration) -> Self {
        Self { drift_threshold }
    }

    /// Apply one polled observation to a speaker's state
    ///
    /// Transitional states are dropped without touching anything. Returns
    /// whether the observation was recorded.
    pub fn reconcile(
        &self,
        device: &mut DeviceState,
        status: TransportState,
        shuffle: bool,
        poll: MediaPoll,
        now: DateTime<Utc>,
    ) -> bool {
        if !status.is_terminal() {
            trace!("Ignoring transitional transport state");
            return false;
        }

        device.shuffle = shuffle;
        let state_changed = status != device.transport;

        match poll {
            MediaPoll::LineIn(source) => apply_line_in(&mut device.media, &source),
            MediaPoll::Radio {
                track,
                media,
                radio_show,
            } => apply_radio(
                &mut device.media,
                &track,
                &media,
                radio_show.as_deref(),
                &device.favorites,
            ),
            MediaPoll::Track(track) => apply_track(
                &mut device.media,
                &track,
                state_changed,
                now,
                self.drift_threshold,
            ),
        }

        device.transport = status;
        true
    }
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::new(Duration::from_millis(1500))
    }
}

pub fn apply_line_in(media: &mut MediaState, source: &str) {
    *media = MediaState {
        kind: MediaKind::LineIn(source.to_string()),
        artist: Some(source.to_string()),
        source_name: Some(source.to_string()),
        ..MediaState::default()
    };
}

pub fn apply_radio(
    media: &mut MediaState,
    track: &TrackInfo,
    info: &MediaInfo,
    radio_show: Option<&str>,
    favorites: &[Favorite],
) {
    media.kind = MediaKind::Radio;
    media.duration = None;
    media.position = None;
    media.image_url = None;
    media.album = None;

    let mut artist = track.artist.clone().filter(|a| !a.is_empty());
    let mut title = track.title.clone().filter(|t| !t.is_empty());

    if let (Some(a), Some(t)) = (&artist, &title) {
        artist = Some(format!("{} - {}", a, t));
    } else if let Some(show) = radio_show.filter(|s| !s.is_empty()) {
        artist = show.split(',').next().map(str::to_string);
    }

    if let Some(station) = info.current_uri_metadata.as_deref().and_then(didl_title) {
        title = Some(station);
    }

    if let (Some(a), Some(t)) = (&artist, &title) {
        artist = strip_station_prefix(a, t);
    }

    let favorite = favorites
        .iter()
        .find(|fav| fav.uri.as_deref() == Some(info.current_uri.as_str()));
    media.source_name = favorite.map(|fav| fav.title.clone());
    if title.is_none() {
        title = media.source_name.clone();
    }

    media.artist = artist;
    media.title = title;
}

/// Trim a leading "{station} - " some stations put into the artist field
fn strip_station_prefix(artist: &str, station: &str) -> Option<String> {
    let prefix = format!("{} - ", station);
    let mut prefix_chars = prefix.chars();
    let mut artist_chars = artist.char_indices();

    let trimmed = loop {
        match (prefix_chars.next(), artist_chars.next()) {
            (None, Some((idx, _))) => break &artist[idx..],
            // Artist is the prefix, or a truncated copy of it
            (_, None) => break "",
            (Some(p), Some((_, a))) if same_letter(p, a) => continue,
            _ => break artist,
        }
    };
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn same_letter(a: char, b: char) -> bool {
    a == b || a.to_uppercase().eq(b.to_uppercase())
}

pub fn apply_track(
    media: &mut MediaState,
    track: &TrackInfo,
    state_changed: bool,
    now: DateTime<Utc>,
    threshold: Duration,
) {
    media.kind = MediaKind::Track;
    media.duration = parse_timespan(track.duration.as_deref());

    let reported = parse_timespan(track.position.as_deref());
    if should_update_position(media.position.as_ref(), reported, state_changed, now, threshold) {
        media.position = reported.map(|position| PositionRecord::new(position, now));
    }

    media.image_url = track.album_art.clone();
    media.artist = track.artist.clone();
    media.album = track.album.clone();
    media.title = track.title.clone();
    media.source_name = None;
}
