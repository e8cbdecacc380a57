//! crates/reading_analytics_core/src/activity.rs
//!
//! Groups raw events into display sessions for the recent-activity feed.

use crate::books::Book;
use crate::domain::{ReadingEvent, ReadingSession};

/// Folds events logged together (same book, day and `created_at`) into one
/// session with a chapter range. Sessions keep the order in which their first
/// event appears.
pub fn group_sessions(events: &[ReadingEvent]) -> Vec<ReadingSession> {
    let mut sessions: Vec<ReadingSession> = Vec::new();

    for event in events {
        let existing = sessions.iter_mut().find(|s| {
            s.book_id == event.book_id && s.date_read == event.date_read && s.logged_at == event.created_at
        });
        match existing {
            Some(session) => {
                session.first_chapter = session.first_chapter.min(event.chapter);
                session.last_chapter = session.last_chapter.max(event.chapter);
                session.chapters += 1;
            }
            None => sessions.push(ReadingSession {
                book_id: event.book_id,
                book_name: Book::name_of(event.book_id),
                first_chapter: event.chapter,
                last_chapter: event.chapter,
                chapters: 1,
                date_read: event.date_read,
                logged_at: event.created_at,
            }),
        }
    }
    sessions
}
