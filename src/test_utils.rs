/// # Test Utilities Module
///
/// Isolated in-memory gradebook fixtures shared by the unit tests.

use crate::core::db::{ensure_schema, Gradebook};
use crate::core::Result;
use rusqlite::Connection;

/// Isolated gradebook backed by an in-memory database
pub struct GradebookFixture {
    pub gradebook: Gradebook,
}

impl GradebookFixture {
    /// Create a gradebook with the standard schema and no rows
    pub fn new() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        ensure_schema(&conn)?;

        Ok(GradebookFixture {
            gradebook: Gradebook::from_connection(conn, "tester"),
        })
    }

    /// Create fixture with three courses, three students and two Math grades
    pub fn with_sample_data() -> Result<Self> {
        let fixture = Self::new()?;
        fixture.execute(
            "
            INSERT INTO course (course_id, course_name) VALUES
                (1, 'Math'),
                (2, 'Art History'),
                (3, 'Physics');

            INSERT INTO student (student_id, first_name, last_name) VALUES
                (1, 'Jane', 'Doe'),
                (2, 'Alan', 'Turing'),
                (3, 'Ada', 'Lovelace');

            INSERT INTO student_grade (student_id, course_id, grade) VALUES
                (1, 1, 85),
                (3, 1, 100);
            ",
        )?;
        Ok(fixture)
    }

    /// The end-to-end scenario: Math and a course literally named
    /// `Art_History`, one student and no grades
    pub fn scenario() -> Result<Self> {
        let fixture = Self::new()?;
        fixture.execute(
            "
            INSERT INTO course (course_id, course_name) VALUES (1, 'Math'), (2, 'Art_History');
            INSERT INTO student (student_id, first_name, last_name) VALUES (1, 'Jane', 'Doe');
            ",
        )?;
        Ok(fixture)
    }

    /// Run raw SQL against the fixture database
    pub fn execute(&self, sql: &str) -> Result<()> {
        self.gradebook.connection().execute_batch(sql)?;
        Ok(())
    }
}
