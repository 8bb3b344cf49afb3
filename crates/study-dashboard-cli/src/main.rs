//! Study Dashboard CLI
//!
//! Inspect patients, print score reports and edit nurse notes from a shell.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use study_dashboard_core::report::{PatientReport, ScoreSection};
use study_dashboard_core::store::Phase;
use study_dashboard_core::{Dashboard, DashboardConfig, NoteFields};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "study-dashboard")]
#[command(about = "Patient dashboard for the depression follow-up study", version)]
struct Cli {
    /// Patient dataset (CSV)
    #[arg(long, global = true, conflicts_with = "config")]
    data: Option<PathBuf>,

    /// Dashboard config file (JSON)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List patient identifiers
    Patients,

    /// Show one patient's report
    Show {
        id: String,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Read or write nurse notes
    Notes {
        #[command(subcommand)]
        action: NotesAction,
    },
}

#[derive(Subcommand)]
enum NotesAction {
    /// Print a patient's notes
    Get { id: String },

    /// Write a patient's notes. Fields not given keep their current value.
    Set {
        id: String,

        #[arg(long)]
        objectives: Option<String>,

        #[arg(long)]
        tasks: Option<String>,

        #[arg(long)]
        comments: Option<String>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    let config = match (&cli.data, &cli.config) {
        (Some(data), _) => DashboardConfig::for_data(data),
        (None, Some(path)) => DashboardConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        (None, None) => bail!("either --data or --config is required"),
    };
    let dashboard = Dashboard::open(config).context("dataset failed validation")?;

    if let Some(warning) = dashboard.dataset_warning()? {
        eprintln!("warning: {warning}");
    }

    match cli.command {
        Commands::Patients => {
            for id in dashboard.patient_ids()? {
                println!("{id}");
            }
        }
        Commands::Show { id, json } => {
            let report = dashboard.report(&id)?;
            if json {
                println!("{}", report.to_json()?);
            } else {
                print_report(&report);
            }
        }
        Commands::Notes { action } => match action {
            NotesAction::Get { id } => {
                print_notes(&dashboard.load_notes(&id));
            }
            NotesAction::Set {
                id,
                objectives,
                tasks,
                comments,
            } => {
                let current = dashboard.load_notes(&id);
                let notes = NoteFields {
                    objectives: objectives.unwrap_or(current.objectives),
                    tasks: tasks.unwrap_or(current.tasks),
                    comments: comments.unwrap_or(current.comments),
                };
                let outcome = dashboard
                    .save_notes(&id, &notes)
                    .with_context(|| format!("failed to save notes for {id}"))?;
                println!("{outcome:?}");
            }
        },
    }

    Ok(())
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn print_report(report: &PatientReport) {
    let demo = &report.demographics;
    let clinical = &report.clinical;
    let number = |v: Option<f64>| v.map_or_else(|| "N/A".to_string(), |v| v.to_string());

    println!("Patient {}", report.metadata.patient_id);
    println!();
    println!("Demographics");
    println!("  Age:        {}", number(demo.age));
    println!("  Sex:        {}", demo.sex);
    println!("  Education:  {}", number(demo.education_years));
    println!("  Income:     {}", demo.income);
    println!();
    println!("Clinical");
    println!("  Comorbidities: {}", clinical.comorbidities);
    println!("  Pregnant:      {}", clinical.pregnant);
    println!("  Cigarettes:    {}", clinical.cigarettes);
    println!("  Alcohol:       {}", clinical.alcohol);
    println!("  Cocaine:       {}", clinical.cocaine);
    println!();
    println!("MADRS total");
    for phase in Phase::ALL {
        println!("  {:<10} {}", phase.label(), report.madrs_total.get(phase));
    }
    if !report.madrs_items.is_empty() {
        println!("MADRS items");
        for item in &report.madrs_items {
            println!(
                "  {:>2} {:<28} {:<10} {}",
                item.item,
                item.label,
                item.phase.label(),
                item.score
            );
        }
    }
    println!();
    println!("PID-5");
    match &report.pid5 {
        ScoreSection::Available { scores } => {
            for s in scores {
                println!(
                    "  {:<22} {:>5} {:>5}",
                    s.label, s.baseline.total, s.follow_up.total
                );
            }
        }
        other => print_unavailable(other),
    }
    println!();
    println!("PHQ-9");
    match &report.phq9 {
        ScoreSection::Available { scores } => {
            for s in scores {
                println!("  {:<7} {}", s.label, s.total);
            }
        }
        other => print_unavailable(other),
    }
    println!();
    print_notes(&report.notes);
}

fn print_unavailable<T>(section: &ScoreSection<T>) {
    match section {
        ScoreSection::NotCollected => println!("  not available for this study"),
        ScoreSection::Incomplete { missing } => {
            println!("  incomplete, missing: {}", missing.join(", "))
        }
        ScoreSection::Available { .. } => {}
    }
}

fn print_notes(notes: &NoteFields) {
    println!("Objectives: {}", notes.objectives);
    println!("Tasks:      {}", notes.tasks);
    println!("Comments:   {}", notes.comments);
}
