use crate::config::CredentialsConfig;
use crate::core::db::{Credentials, Gradebook};
use crate::core::{GradebookError, Result, UsageError};
use std::io::{self, BufRead, Write};
use tracing::debug;

/// Text printed by the `h` command.
pub const HELP_TEXT: &str = "\
Available commands:
  h                         - Show this help
  c                         - List courses sorted by name
  s                         - List all students
  g <course>                - List graded students of a course with their grades
  g <course> <last>         - Show the grade of the student with last name <last>
  u <course> <last> <grade> - Set the grade of a student in a course
  q                         - Quit
Use _ instead of spaces in course and student names.";

const PROMPT: &str = "gradebook> ";

/// Represents a parsed REPL command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Courses,
    Students,
    CourseGrades {
        course: String,
    },
    StudentGrade {
        course: String,
        last_name: String,
    },
    Upsert {
        course: String,
        last_name: String,
        grade: i64,
    },
    Quit,
    Unknown(String),
}

/// Dispatcher state. Only `q` (or the end of input) leaves `Running`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Running,
    Terminated,
}

/// Turns a command-line name argument back into the stored name.
fn unescape_name(token: &str) -> String {
    token.replace('_', " ")
}

/// Parses one line of input into a `Command`.
///
/// The first whitespace-separated token selects the command. Argument
/// counts of `g` and `u` and the grade of `u` are checked here, so a
/// malformed line never reaches the database. Extra arguments to the
/// argument-less commands are ignored.
pub fn parse_command(input: &str) -> std::result::Result<Command, UsageError> {
    let parts: Vec<&str> = input.split_whitespace().collect();
    let Some((&head, args)) = parts.split_first() else {
        return Ok(Command::Unknown(String::new()));
    };

    let command = match head {
        "h" => Command::Help,
        "c" => Command::Courses,
        "s" => Command::Students,
        "q" => Command::Quit,
        "g" => match args {
            [course] => Command::CourseGrades {
                course: unescape_name(course),
            },
            [course, last_name] => Command::StudentGrade {
                course: unescape_name(course),
                last_name: unescape_name(last_name),
            },
            _ => {
                return Err(UsageError::WrongArgCount {
                    command: 'g',
                    expected: "1 or 2",
                    given: args.len(),
                })
            }
        },
        "u" => match args {
            [course, last_name, grade] => Command::Upsert {
                course: unescape_name(course),
                last_name: unescape_name(last_name),
                grade: grade
                    .parse()
                    .map_err(|_| UsageError::InvalidGrade(grade.to_string()))?,
            },
            _ => {
                return Err(UsageError::WrongArgCount {
                    command: 'u',
                    expected: "3",
                    given: args.len(),
                })
            }
        },
        other => Command::Unknown(other.to_string()),
    };
    Ok(command)
}

/// Asks for a username and password on `output`, reading the answers from
/// `input`. Blank answers (and end of input) select the configured defaults.
pub fn prompt_credentials<R: BufRead, W: Write>(
    input: &mut R,
    output: &mut W,
    defaults: &CredentialsConfig,
) -> io::Result<Credentials> {
    write!(output, "username [{}]: ", defaults.default_user)?;
    output.flush()?;
    let mut username = String::new();
    input.read_line(&mut username)?;

    write!(output, "password: ")?;
    output.flush()?;
    let mut password = String::new();
    input.read_line(&mut password)?;

    Ok(Credentials::resolve(&username, &password, defaults))
}

/// The command dispatcher. Owns the gradebook connection for its whole
/// lifetime and writes every result and error to `out`.
pub struct Repl<W: Write> {
    gradebook: Option<Gradebook>,
    out: W,
    state: State,
}

impl<W: Write> Repl<W> {
    pub fn new(gradebook: Gradebook, out: W) -> Self {
        Repl {
            gradebook: Some(gradebook),
            out,
            state: State::Running,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Reads commands from `input` until `q` or end of input.
    pub fn run<R: BufRead>(&mut self, mut input: R) -> Result<()> {
        let mut line = String::new();
        while self.state == State::Running {
            write!(self.out, "{}", PROMPT)?;
            self.out.flush()?;

            line.clear();
            if input.read_line(&mut line)? == 0 {
                writeln!(self.out)?;
                self.terminate();
                break;
            }
            self.handle_line(&line)?;
        }
        Ok(())
    }

    /// Parses and executes one line. Command failures are printed and the
    /// dispatcher keeps running; only a failure to write output is returned.
    pub fn handle_line(&mut self, line: &str) -> Result<State> {
        if line.trim().is_empty() {
            return Ok(self.state);
        }

        let outcome = parse_command(line)
            .map_err(GradebookError::from)
            .and_then(|command| self.execute(command));

        match outcome {
            Ok(()) => {}
            Err(GradebookError::Io(e)) => return Err(GradebookError::Io(e)),
            Err(e) => {
                debug!("Command failed: {}", e);
                writeln!(self.out, "{}", e)?;
            }
        }
        Ok(self.state)
    }

    /// Runs one parsed command.
    pub fn execute(&mut self, command: Command) -> Result<()> {
        debug!(?command, "Dispatching");
        match command {
            Command::Help => writeln!(self.out, "{}", HELP_TEXT)?,
            Command::Courses => {
                let courses = self.gradebook()?.list_courses()?;
                for course in courses {
                    writeln!(self.out, "{}", course.name)?;
                }
            }
            Command::Students => {
                let students = self.gradebook()?.list_students()?;
                for student in students {
                    writeln!(self.out, "{} {}", student.first_name, student.last_name)?;
                }
            }
            Command::CourseGrades { course } => {
                let grades = self.gradebook()?.list_grades_for_course(&course)?;
                for row in grades {
                    writeln!(self.out, "{} {}: {}", row.first_name, row.last_name, row.grade)?;
                }
            }
            Command::StudentGrade { course, last_name } => {
                let grade = self.gradebook()?.get_grade(&course, &last_name)?;
                match grade {
                    Some(grade) => {
                        writeln!(self.out, "Grade of {} for {}: {}", last_name, course, grade)?
                    }
                    None => writeln!(self.out, "Grade of {} for {}: not found", last_name, course)?,
                }
            }
            Command::Upsert {
                course,
                last_name,
                grade,
            } => {
                self.gradebook()?.upsert_grade(&course, &last_name, grade)?;
                writeln!(self.out, "Grade of {} for {} set to {}", last_name, course, grade)?;
            }
            Command::Quit => {
                writeln!(self.out, "Bye!")?;
                self.terminate();
            }
            Command::Unknown(token) => {
                writeln!(self.out, "Unknown command: {} (type h for help)", token)?
            }
        }
        Ok(())
    }

    fn gradebook(&self) -> Result<&Gradebook> {
        self.gradebook.as_ref().ok_or(GradebookError::Closed)
    }

    fn terminate(&mut self) {
        if let Some(gradebook) = self.gradebook.take() {
            gradebook.close();
        }
        self.state = State::Terminated;
    }
}
