use color_eyre::{eyre::eyre, Result};
use conecta_core::{
    cipher::Cipher,
    students::{NewStudent, Student, StudentRepository},
};
use uuid::Uuid;

use crate::{app::App, cli::StudentCommand};

/// Execute a student subcommand against the encrypted repository.
pub fn handle<C: Cipher>(cmd: StudentCommand, app: &App<C>) -> Result<()> {
    let repo = app.students()?;

    match cmd {
        StudentCommand::List(output) => {
            let students = repo.list().map_err(|e| eyre!("{e:#}"))?;
            if output.json {
                println!("{}", serde_json::to_string_pretty(&students)?);
                return Ok(());
            }
            if students.is_empty() {
                println!("No students yet. Add one with `conecta student add --name <name>`.");
                return Ok(());
            }
            for student in &students {
                println!("{}", summary_line(student));
            }
        }
        StudentCommand::Add {
            name,
            enrollment,
            email,
        } => {
            let student = repo
                .create(NewStudent {
                    name,
                    enrollment,
                    email,
                })
                .map_err(|e| eyre!("{e:#}"))?;
            println!("Registered student {}", student.id);
        }
        StudentCommand::Show { id, output } => {
            let id = parse_id(&id)?;
            let student = repo
                .get(id)
                .map_err(|e| eyre!("{e:#}"))?
                .ok_or_else(|| eyre!("student {id} not found"))?;
            if output.json {
                println!("{}", serde_json::to_string_pretty(&student)?);
            } else {
                println!("{}", summary_line(&student));
                println!("    email: {}", display_field(student.email.as_deref()));
                println!("    registered: {}", student.created_at.to_rfc3339());
            }
        }
        StudentCommand::Remove { id } => {
            let id = parse_id(&id)?;
            if repo.delete(id).map_err(|e| eyre!("{e:#}"))? {
                println!("Removed student {id}");
            } else {
                println!("No student with id {id}");
            }
        }
    }

    Ok(())
}

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| eyre!("invalid student id {raw:?}: {e}"))
}

fn summary_line(student: &Student) -> String {
    let enrollment = student
        .enrollment
        .map(|n| n.to_string())
        .unwrap_or_else(|| "-".to_string());
    format!(
        "{} [{}] {}",
        student.id,
        enrollment,
        display_field(student.name.as_deref())
    )
}

/// Unreadable or absent encrypted fields render as a dash.
fn display_field(value: Option<&str>) -> &str {
    value.unwrap_or("-")
}
