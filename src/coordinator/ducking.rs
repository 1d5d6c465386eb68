//! Volume ducking policy.
//!
//! The media volume has three writers: the user, the ducking policy, and the
//! mute toggle. The user's explicit sets are recorded as the baseline; the
//! policy only ever reads the baseline, so restoring after ducking can never
//! clobber a volume the user picked mid-duck. Mute is orthogonal and wins
//! over everything.

/// Derived ducking state. Applied volume is always a pure function of
/// `{voice_listening, ai_audio_playing}` against the baseline.
#[derive(Debug, Clone)]
pub struct DuckingControl {
    baseline: u8,
    ducking_percent: u8,
    muted: bool,
    voice_listening: bool,
    ai_audio_playing: bool,
    applied: u8,
}

impl DuckingControl {
    pub fn new(baseline: u8, ducking_percent: u8) -> Self {
        Self {
            baseline: baseline.min(100),
            ducking_percent: ducking_percent.min(100),
            muted: false,
            voice_listening: false,
            ai_audio_playing: false,
            applied: baseline.min(100),
        }
    }

    pub fn set_ducking_percent(&mut self, percent: u8) {
        self.ducking_percent = percent.min(100);
    }

    /// Record an explicit user volume. The baseline updates even while
    /// ducked; the ducked level stays applied until both flags clear.
    pub fn set_baseline(&mut self, volume: u8) {
        self.baseline = volume.min(100);
    }

    pub fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    pub fn set_voice_listening(&mut self, listening: bool) {
        self.voice_listening = listening;
    }

    pub fn set_ai_audio_playing(&mut self, playing: bool) {
        self.ai_audio_playing = playing;
    }

    pub fn is_ducked(&self) -> bool {
        self.voice_listening || self.ai_audio_playing
    }

    pub fn baseline(&self) -> u8 {
        self.baseline
    }

    /// Volume last applied to the player.
    pub fn applied(&self) -> u8 {
        self.applied
    }

    /// Audible output level: silent while muted regardless of ducking.
    pub fn effective_output(&self) -> u8 {
        if self.muted {
            0
        } else {
            self.applied
        }
    }

    fn desired(&self) -> u8 {
        if self.is_ducked() {
            self.ducking_percent
        } else {
            self.baseline
        }
    }

    /// Reconcile the applied volume with the current flags. Returns the new
    /// volume when the player needs an update, `None` when nothing changed.
    /// Setting a volume never unmutes; mute stays with the player.
    pub fn sync(&mut self) -> Option<u8> {
        let desired = self.desired();
        if desired != self.applied {
            self.applied = desired;
            Some(desired)
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duck_and_restore() {
        let mut ducking = DuckingControl::new(80, 20);

        ducking.set_voice_listening(true);
        assert_eq!(ducking.sync(), Some(20));

        ducking.set_voice_listening(false);
        assert_eq!(ducking.sync(), Some(80));
        assert_eq!(ducking.sync(), None);
    }

    #[test]
    fn test_either_flag_keeps_duck_active() {
        let mut ducking = DuckingControl::new(80, 20);

        ducking.set_voice_listening(true);
        ducking.set_ai_audio_playing(true);
        assert_eq!(ducking.sync(), Some(20));

        ducking.set_voice_listening(false);
        // AI audio still playing, stay ducked.
        assert_eq!(ducking.sync(), None);

        ducking.set_ai_audio_playing(false);
        assert_eq!(ducking.sync(), Some(80));
    }

    #[test]
    fn test_user_volume_during_duck_becomes_new_baseline() {
        let mut ducking = DuckingControl::new(80, 20);

        ducking.set_ai_audio_playing(true);
        assert_eq!(ducking.sync(), Some(20));

        // User picks a new volume mid-duck; the duck level holds.
        ducking.set_baseline(40);
        assert_eq!(ducking.sync(), None);

        ducking.set_ai_audio_playing(false);
        assert_eq!(ducking.sync(), Some(40));
    }

    #[test]
    fn test_mute_wins_over_restore() {
        let mut ducking = DuckingControl::new(80, 20);
        ducking.set_muted(true);

        ducking.set_voice_listening(true);
        ducking.sync();
        ducking.set_voice_listening(false);
        ducking.sync();

        // Volume was restored but the output stays silent.
        assert_eq!(ducking.applied(), 80);
        assert_eq!(ducking.effective_output(), 0);
    }
}
