/// Connection Management Module
///
/// Owns the single live connection to the gradebook store. A `Gradebook` is
/// created once at startup and handed to the dispatcher, which releases it on
/// every exit path: explicitly through [`Gradebook::close`], or by drop.

use super::schema;
use crate::config::{CredentialsConfig, DatabaseConfig};
use crate::core::Result;
use rusqlite::{Connection, OpenFlags};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info};

/// Username and password entered at the startup prompt.
///
/// SQLite performs no authentication, so the password is only carried along;
/// the username identifies the session in the logs.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Builds credentials from raw prompt input, falling back to the
    /// configured defaults for blank answers.
    pub fn resolve(username: &str, password: &str, defaults: &CredentialsConfig) -> Self {
        let username = username.trim();
        let password = password.trim_end_matches(['\r', '\n']);
        Credentials {
            username: if username.is_empty() {
                defaults.default_user.clone()
            } else {
                username.to_string()
            },
            password: if password.is_empty() {
                defaults.default_password.clone()
            } else {
                password.to_string()
            },
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// The data access handle: one open connection plus session metadata.
#[derive(Debug)]
pub struct Gradebook {
    pub(crate) conn: Connection,
    /// Path the connection was opened on (None for in-memory databases)
    path: Option<PathBuf>,
    username: String,
}

impl Gradebook {
    /// Opens the database described by `config`.
    ///
    /// On any failure the partially opened connection is dropped (and so
    /// closed) before the error is returned. There is no retry.
    ///
    /// # Errors
    ///
    /// `GradebookError::Database` when SQLite cannot open the file or a
    /// startup pragma fails, `GradebookError::Io` when the parent directory
    /// cannot be created.
    pub fn connect(config: &DatabaseConfig, credentials: &Credentials) -> Result<Self> {
        let in_memory = config.path == Path::new(":memory:");
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;

        if config.create_if_missing {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
            if !in_memory {
                if let Some(parent) = config.path.parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        debug!("Creating database directory {:?}", parent);
                        fs::create_dir_all(parent)?;
                    }
                }
            }
        }

        let conn = Connection::open_with_flags(&config.path, flags)?;
        conn.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;

        if config.create_schema {
            schema::ensure_schema(&conn)?;
        }

        let summary = schema::schema_summary(&conn)?;
        info!(
            path = %config.path.display(),
            user = %credentials.username,
            courses = summary.courses,
            students = summary.students,
            grades = summary.grades,
            "Connected to gradebook"
        );

        Ok(Gradebook {
            conn,
            path: if in_memory {
                None
            } else {
                Some(config.path.clone())
            },
            username: credentials.username.clone(),
        })
    }

    /// Wraps an already open connection. The schema is not touched.
    pub fn from_connection(conn: Connection, username: &str) -> Self {
        Gradebook {
            conn,
            path: None,
            username: username.to_string(),
        }
    }

    /// Closes the connection. A failure is logged, never returned.
    pub fn close(self) {
        let username = self.username;
        match self.conn.close() {
            Ok(()) => info!(user = %username, "Closed gradebook connection"),
            Err((_conn, e)) => error!("Failed to close gradebook connection: {}", e),
        }
    }

    /// The underlying SQLite connection
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Path of the database file (None for in-memory databases)
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Username entered at startup
    pub fn username(&self) -> &str {
        &self.username
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::GradebookError;

    fn memory_config() -> DatabaseConfig {
        DatabaseConfig {
            path: PathBuf::from(":memory:"),
            ..DatabaseConfig::default()
        }
    }

    fn credentials() -> Credentials {
        Credentials::resolve("", "", &CredentialsConfig::default())
    }

    #[test]
    fn test_credentials_fall_back_to_defaults() {
        let defaults = CredentialsConfig {
            default_user: "postgres".to_string(),
            default_password: "12345678".to_string(),
        };

        let blank = Credentials::resolve("\n", "\n", &defaults);
        assert_eq!(blank.username, "postgres");
        assert_eq!(blank.password, "12345678");

        let given = Credentials::resolve(" alice\n", "pa ss\r\n", &defaults);
        assert_eq!(given.username, "alice");
        assert_eq!(given.password, "pa ss");
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::resolve("bob", "hunter2", &CredentialsConfig::default());
        let debug = format!("{:?}", creds);
        assert!(debug.contains("bob"));
        assert!(!debug.contains("hunter2"));
    }

    #[test]
    fn test_connect_in_memory_creates_schema() {
        let gradebook = Gradebook::connect(&memory_config(), &credentials()).unwrap();
        assert_eq!(gradebook.path(), None);
        assert_eq!(gradebook.username(), "admin");

        let summary = schema::schema_summary(gradebook.connection()).unwrap();
        assert_eq!(summary.courses, 0);
        gradebook.close();
    }

    #[test]
    fn test_connect_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("grades.db");
        let config = DatabaseConfig {
            path: path.clone(),
            ..DatabaseConfig::default()
        };

        let gradebook = Gradebook::connect(&config, &credentials()).unwrap();
        assert_eq!(gradebook.path(), Some(path.as_path()));
        gradebook.close();
        assert!(path.exists());
    }

    #[test]
    fn test_connect_without_create_fails_on_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = DatabaseConfig {
            path: dir.path().join("absent.db"),
            create_if_missing: false,
            ..DatabaseConfig::default()
        };

        match Gradebook::connect(&config, &credentials()) {
            Err(GradebookError::Database(_)) => {}
            other => panic!("Expected Database error, got {:?}", other),
        }
    }

    #[test]
    fn test_upsert_on_existing_store_without_unique_index() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("external.db");
        Connection::open(&path)
            .unwrap()
            .execute_batch(
                "CREATE TABLE course (course_id INTEGER PRIMARY KEY, course_name TEXT);
                 CREATE TABLE student (student_id INTEGER PRIMARY KEY, first_name TEXT, last_name TEXT);
                 CREATE TABLE student_grade (student_id INTEGER, course_id INTEGER, grade INTEGER);
                 INSERT INTO course VALUES (1, 'Math');
                 INSERT INTO student VALUES (1, 'Jane', 'Doe');",
            )
            .unwrap();
        let config = DatabaseConfig {
            path,
            create_if_missing: false,
            create_schema: false,
            ..DatabaseConfig::default()
        };

        let gradebook = Gradebook::connect(&config, &credentials()).unwrap();
        assert!(!schema::has_unique_grade_pair(gradebook.connection()).unwrap());

        gradebook.upsert_grade("Math", "Doe", 90).unwrap();
        gradebook.upsert_grade("Math", "Doe", 75).unwrap();
        assert_eq!(gradebook.get_grade("Math", "Doe").unwrap(), Some(75));

        let rows: i64 = gradebook
            .connection()
            .query_row("SELECT COUNT(*) FROM student_grade", [], |row| row.get(0))
            .unwrap();
        assert_eq!(rows, 1);
        gradebook.close();
    }

    #[test]
    fn test_connect_without_schema_reports_missing_tables() {
        let config = DatabaseConfig {
            create_schema: false,
            ..memory_config()
        };

        // The startup summary needs the tables, so an empty store is refused.
        assert!(Gradebook::connect(&config, &credentials()).is_err());
    }
}
