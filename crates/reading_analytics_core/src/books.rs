//! crates/reading_analytics_core/src/books.rs
//!
//! The canonical 66-book catalogue. Catalogue order doubles as the
//! deterministic tie-break order for every "most read" grouping.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Testament {
    Old,
    New,
}

impl Testament {
    pub fn name(self) -> &'static str {
        match self {
            Testament::Old => "Old Testament",
            Testament::New => "New Testament",
        }
    }
}

/// Literary grouping, declared in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Genre {
    Law,
    History,
    Wisdom,
    MajorProphets,
    MinorProphets,
    Gospels,
    PaulineEpistles,
    GeneralEpistles,
    Apocalyptic,
}

impl Genre {
    pub fn name(self) -> &'static str {
        match self {
            Genre::Law => "Law",
            Genre::History => "History",
            Genre::Wisdom => "Wisdom & Poetry",
            Genre::MajorProphets => "Major Prophets",
            Genre::MinorProphets => "Minor Prophets",
            Genre::Gospels => "Gospels",
            Genre::PaulineEpistles => "Pauline Epistles",
            Genre::GeneralEpistles => "General Epistles",
            Genre::Apocalyptic => "Apocalyptic",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Book {
    pub id: u8,
    pub name: &'static str,
    pub genre: Genre,
}

impl Book {
    pub fn testament(&self) -> Testament {
        if self.id <= 39 {
            Testament::Old
        } else {
            Testament::New
        }
    }

    /// Looks up a book by its 1-based canonical id.
    pub fn by_id(id: u8) -> Option<&'static Book> {
        BOOKS.get(usize::from(id).checked_sub(1)?)
    }

    /// Display name, falling back to a placeholder for unknown ids.
    pub fn name_of(id: u8) -> String {
        Self::by_id(id)
            .map(|b| b.name.to_string())
            .unwrap_or_else(|| format!("Book {id}"))
    }
}

const fn book(id: u8, name: &'static str, genre: Genre) -> Book {
    Book { id, name, genre }
}

use Genre::*;

pub static BOOKS: [Book; 66] = [
    book(1, "Genesis", Law),
    book(2, "Exodus", Law),
    book(3, "Leviticus", Law),
    book(4, "Numbers", Law),
    book(5, "Deuteronomy", Law),
    book(6, "Joshua", History),
    book(7, "Judges", History),
    book(8, "Ruth", History),
    book(9, "1 Samuel", History),
    book(10, "2 Samuel", History),
    book(11, "1 Kings", History),
    book(12, "2 Kings", History),
    book(13, "1 Chronicles", History),
    book(14, "2 Chronicles", History),
    book(15, "Ezra", History),
    book(16, "Nehemiah", History),
    book(17, "Esther", History),
    book(18, "Job", Wisdom),
    book(19, "Psalms", Wisdom),
    book(20, "Proverbs", Wisdom),
    book(21, "Ecclesiastes", Wisdom),
    book(22, "Song of Solomon", Wisdom),
    book(23, "Isaiah", MajorProphets),
    book(24, "Jeremiah", MajorProphets),
    book(25, "Lamentations", MajorProphets),
    book(26, "Ezekiel", MajorProphets),
    book(27, "Daniel", MajorProphets),
    book(28, "Hosea", MinorProphets),
    book(29, "Joel", MinorProphets),
    book(30, "Amos", MinorProphets),
    book(31, "Obadiah", MinorProphets),
    book(32, "Jonah", MinorProphets),
    book(33, "Micah", MinorProphets),
    book(34, "Nahum", MinorProphets),
    book(35, "Habakkuk", MinorProphets),
    book(36, "Zephaniah", MinorProphets),
    book(37, "Haggai", MinorProphets),
    book(38, "Zechariah", MinorProphets),
    book(39, "Malachi", MinorProphets),
    book(40, "Matthew", Gospels),
    book(41, "Mark", Gospels),
    book(42, "Luke", Gospels),
    book(43, "John", Gospels),
    book(44, "Acts", History),
    book(45, "Romans", PaulineEpistles),
    book(46, "1 Corinthians", PaulineEpistles),
    book(47, "2 Corinthians", PaulineEpistles),
    book(48, "Galatians", PaulineEpistles),
    book(49, "Ephesians", PaulineEpistles),
    book(50, "Philippians", PaulineEpistles),
    book(51, "Colossians", PaulineEpistles),
    book(52, "1 Thessalonians", PaulineEpistles),
    book(53, "2 Thessalonians", PaulineEpistles),
    book(54, "1 Timothy", PaulineEpistles),
    book(55, "2 Timothy", PaulineEpistles),
    book(56, "Titus", PaulineEpistles),
    book(57, "Philemon", PaulineEpistles),
    book(58, "Hebrews", GeneralEpistles),
    book(59, "James", GeneralEpistles),
    book(60, "1 Peter", GeneralEpistles),
    book(61, "2 Peter", GeneralEpistles),
    book(62, "1 John", GeneralEpistles),
    book(63, "2 John", GeneralEpistles),
    book(64, "3 John", GeneralEpistles),
    book(65, "Jude", GeneralEpistles),
    book(66, "Revelation", Apocalyptic),
];
