//! Termination policies, one per operation family.

use crate::core::Record;

/// Whether a session dispatches another chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Continue,
    Stop,
}

/// What a policy sees after a chunk has been accumulated.
#[derive(Debug, Clone, Copy)]
pub struct PageReport<'a> {
    /// Records (or row results) returned by the latest chunk.
    pub page_rows: usize,
    /// Work items still queued.
    pub remaining: usize,
    /// Total accumulated so far, including this chunk.
    pub accumulated: usize,
    /// Last accumulated record, for watermark-based policies.
    pub last_record: Option<&'a Record>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TerminationPolicy {
    /// Id-list fetch, value-match search and bulk writes: stop when the queue is empty.
    QueueExhaustion,

    /// Time-ordered scan: continue while pages come back full.
    ///
    /// Past `limit`, the scan still continues until the last accumulated
    /// record's watermark differs from the requested one, so a group of
    /// records sharing the requested timestamp is never cut in half.
    ShortPage {
        page_size: usize,
        limit: Option<usize>,
        watermark_field: String,
        requested_watermark: String,
    },

    /// Criteria search: exactly one page.
    SinglePage,
}

impl TerminationPolicy {
    /// Checked before every dispatch. An empty queue never reaches the transport.
    pub fn before_dispatch(&self, remaining: usize) -> Step {
        match self {
            TerminationPolicy::QueueExhaustion if remaining == 0 => Step::Stop,
            _ => Step::Continue,
        }
    }

    /// Checked after every successful chunk.
    pub fn after_page(&self, report: &PageReport<'_>) -> Step {
        match self {
            TerminationPolicy::QueueExhaustion => {
                if report.remaining == 0 {
                    Step::Stop
                } else {
                    Step::Continue
                }
            }
            TerminationPolicy::ShortPage {
                page_size,
                limit,
                watermark_field,
                requested_watermark,
            } => {
                if report.page_rows < *page_size {
                    return Step::Stop;
                }
                let last_watermark = report.last_record.and_then(|r| r.get(watermark_field));
                match limit {
                    Some(limit)
                        if report.accumulated > *limit
                            && last_watermark != Some(requested_watermark.as_str()) =>
                    {
                        Step::Stop
                    }
                    _ => Step::Continue,
                }
            }
            TerminationPolicy::SinglePage => Step::Stop,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: &str = "2016-09-05 14:00:00";

    fn scan(limit: Option<usize>) -> TerminationPolicy {
        TerminationPolicy::ShortPage {
            page_size: 200,
            limit,
            watermark_field: "Modified Time".into(),
            requested_watermark: T.into(),
        }
    }

    fn report(page_rows: usize, accumulated: usize, last: Option<&Record>) -> PageReport<'_> {
        PageReport {
            page_rows,
            remaining: 0,
            accumulated,
            last_record: last,
        }
    }

    #[test]
    fn test_queue_exhaustion() {
        let policy = TerminationPolicy::QueueExhaustion;
        assert_eq!(policy.before_dispatch(0), Step::Stop);
        assert_eq!(policy.before_dispatch(3), Step::Continue);

        let mut r = report(5, 5, None);
        r.remaining = 7;
        assert_eq!(policy.after_page(&r), Step::Continue);
        r.remaining = 0;
        assert_eq!(policy.after_page(&r), Step::Stop);
    }

    #[test]
    fn test_short_page_stops() {
        let last = Record::new().with("Modified Time", T);
        assert_eq!(scan(None).after_page(&report(199, 399, Some(&last))), Step::Stop);
        assert_eq!(scan(None).after_page(&report(0, 0, None)), Step::Stop);
    }

    #[test]
    fn test_full_page_continues_without_limit() {
        let last = Record::new().with("Modified Time", "2020-01-01 00:00:00");
        assert_eq!(scan(None).after_page(&report(200, 200, Some(&last))), Step::Continue);
    }

    #[test]
    fn test_limit_stops_once_watermark_moves_on() {
        let later = Record::new().with("Modified Time", "2016-09-05 14:00:01");
        assert_eq!(scan(Some(150)).after_page(&report(200, 200, Some(&later))), Step::Stop);
        // Not past the limit yet
        assert_eq!(scan(Some(200)).after_page(&report(200, 200, Some(&later))), Step::Continue);
    }

    #[test]
    fn test_limit_ignored_inside_requested_watermark_group() {
        let same = Record::new().with("Modified Time", T);
        assert_eq!(scan(Some(1)).after_page(&report(200, 400, Some(&same))), Step::Continue);
    }

    #[test]
    fn test_missing_watermark_field_counts_as_different() {
        let bare = Record::new().with("Id", "1");
        assert_eq!(scan(Some(1)).after_page(&report(200, 200, Some(&bare))), Step::Stop);
    }

    #[test]
    fn test_single_page() {
        let policy = TerminationPolicy::SinglePage;
        assert_eq!(policy.before_dispatch(0), Step::Continue);
        assert_eq!(policy.after_page(&report(200, 200, None)), Step::Stop);
    }
}
