//! Second chance for videos that failed behind YouTube's age gate.
//!
//! Playlist extraction with cookies can still fail for age-restricted videos,
//! while asking for the single video with the same cookies usually works.
//! Every captured id gets exactly one extra `yt-dlp` call, one at a time.

use std::thread;
use std::time::Duration;

use tracing::{debug, info};

use crate::classify::{LineClassifier, LineKind};
use crate::error::{FailedRecovery, ImportError, RecoveryError};
use crate::extractor::Extractor;
use crate::fragments::FragmentAssembler;
use crate::playlist::PlaylistRecord;
use crate::record::{Clock, MappedVideoRecord, RecordMapper};
use crate::report::Reporter;
use crate::video_id::VideoId;

#[derive(Debug, Default)]
pub struct RecoveryOutcome {
    pub recovered: Vec<VideoId>,
    pub failed: Vec<FailedRecovery>,
}

/// Re-fetches `video_ids` in order and appends every success to `playlist`.
/// Failures are reported and skipped; they never stop the remaining ids.
pub fn recover_age_restricted<E, C, R>(
    extractor: &E,
    video_ids: &[VideoId],
    delay: Option<Duration>,
    mapper: &mut RecordMapper<C>,
    playlist: &mut PlaylistRecord,
    reporter: &mut R,
) -> RecoveryOutcome
where
    E: Extractor,
    C: Clock,
    R: Reporter,
{
    let mut outcome = RecoveryOutcome::default();

    for video_id in video_ids {
        if let Some(delay) = delay.filter(|delay| !delay.is_zero()) {
            thread::sleep(delay);
        }
        reporter.recovering(video_id);

        match recover_one(extractor, video_id, mapper, reporter) {
            Ok(video) => {
                info!(%video_id, "recovered age-restricted video");
                reporter.recovered(&video);
                playlist.videos.push(video);
                outcome.recovered.push(video_id.clone());
            }
            Err(error) => {
                debug!(%video_id, %error, "age-restricted video stays missing");
                let failure = FailedRecovery {
                    video_id: video_id.clone(),
                    error,
                };
                reporter.recovery_failed(&failure);
                outcome.failed.push(failure);
            }
        }
    }

    outcome
}

fn recover_one<E, C, R>(
    extractor: &E,
    video_id: &VideoId,
    mapper: &mut RecordMapper<C>,
    reporter: &mut R,
) -> Result<MappedVideoRecord, RecoveryError>
where
    E: Extractor,
    C: Clock,
    R: Reporter,
{
    let lines = extractor.video(video_id).map_err(RecoveryError::Extractor)?;
    let mut classifier = LineClassifier::new(true);
    let mut assembler = FragmentAssembler::new();
    let mut first_error: Option<String> = None;

    for line in lines {
        let line = line.map_err(|err| RecoveryError::Extractor(ImportError::Stream(err)))?;
        match classifier.classify(&line) {
            LineKind::Data => {
                reporter.data_line(&line);
                assembler.push_line(&line);
            }
            LineKind::Noise => {}
            LineKind::PlainError | LineKind::AgeRestricted(_) | LineKind::Fatal(_) => {
                reporter.extractor_error(&line);
                first_error.get_or_insert(line);
            }
        }
    }

    if assembler.is_empty() {
        return Err(match first_error {
            Some(line) => RecoveryError::Reported(line),
            None => RecoveryError::Empty,
        });
    }

    let records = assembler.finish().map_err(RecoveryError::Malformed)?;
    let raw = records.first().ok_or(RecoveryError::Empty)?;
    Ok(mapper.map(raw, 1)?)
}
