use anyhow::{bail, Result};
use colored::*;
use std::collections::HashMap;
use std::path::PathBuf;

use neurocalm::config::Config;
use neurocalm::core::insights::InsightKind;
use neurocalm::dashboard::Dashboard;
use neurocalm::export::ExportFormat;
use neurocalm::pipeline::{ChatOutcome, CheckinOutcome};
use neurocalm::server;

pub use commands::{Args, Commands};

mod commands;

pub async fn run(args: Args) -> Result<()> {
    let data_dir = args.data_dir;

    match args.command {
        Commands::Checkin {
            user,
            mood,
            sleep,
            diet,
            exercise,
            stressors,
            goals,
            provider,
            model,
        } => {
            let mut fields = HashMap::new();
            fields.insert("mood".to_string(), mood);
            fields.insert("sleep".to_string(), sleep);
            fields.insert("diet".to_string(), diet);
            fields.insert("exercise".to_string(), exercise);
            fields.insert("stressors".to_string(), stressors);
            if let Some(goals) = goals {
                fields.insert("userGoals".to_string(), goals);
            }
            handle_checkin(data_dir, user, fields, provider, model).await
        }
        Commands::Chat {
            question,
            user,
            provider,
            model,
        } => handle_chat(data_dir, user, question, provider, model).await,
        Commands::Status { user } => handle_status(data_dir, user).await,
        Commands::History { user, days } => handle_history(data_dir, user, days).await,
        Commands::Insights { user } => handle_insights(data_dir, user).await,
        Commands::Export {
            user,
            format,
            output,
        } => handle_export(data_dir, user, format, output).await,
        Commands::Reset { user, yes } => handle_reset(data_dir, user, yes).await,
        Commands::Server {
            host,
            port,
            provider,
            model,
        } => handle_server(data_dir, host, port, provider, model).await,
    }
}

fn open(
    data_dir: Option<PathBuf>,
    provider: Option<String>,
    model: Option<String>,
) -> Result<(Config, Dashboard)> {
    let config = Config::new(data_dir)?;
    let dashboard = Dashboard::from_config(&config, provider, model)?;
    Ok((config, dashboard))
}

pub async fn handle_checkin(
    data_dir: Option<PathBuf>,
    user: String,
    fields: HashMap<String, String>,
    provider: Option<String>,
    model: Option<String>,
) -> Result<()> {
    let (_, dashboard) = open(data_dir, provider, model)?;

    match dashboard.check_in(&user, &fields).await {
        CheckinOutcome::Success { data } => {
            println!("{}", "✅ Check-in complete".green().bold());
            println!(
                "  Calm Index:         {}",
                format!("{:.0}", data.scores.calm_index).cyan()
            );
            println!(
                "  Productivity Index: {}",
                format!("{:.0}", data.scores.productivity_index).cyan()
            );

            println!("\n{}", "🎯 Personalized recommendations".bold());
            for rec in &data.personalized_recommendations {
                println!("  • {}", rec);
            }

            println!("\n{}", "🧰 Habit tools".bold());
            for tool in &data.habit_tools {
                println!("  • {}", tool);
            }
        }
        CheckinOutcome::Error { error } => {
            println!("{} {}", "❌".red(), error.red());
        }
    }

    Ok(())
}

pub async fn handle_chat(
    data_dir: Option<PathBuf>,
    user: String,
    question: String,
    provider: Option<String>,
    model: Option<String>,
) -> Result<()> {
    let (_, dashboard) = open(data_dir, provider, model)?;

    match dashboard.chat(&user, &question, None).await? {
        ChatOutcome::Success { answer } => {
            println!("{} {}", "🧠 Coach:".cyan().bold(), answer);
        }
        ChatOutcome::Error { error } => {
            println!("{} {}", "❌".red(), error.red());
        }
    }

    Ok(())
}

pub async fn handle_status(data_dir: Option<PathBuf>, user: String) -> Result<()> {
    let (_, dashboard) = open(data_dir, None, None)?;
    let state = dashboard.state(&user).await?;

    println!("{} {}", "📋 Status for".bold(), user.cyan());

    if !state.has_checked_in() {
        println!("  No check-in yet. Run `neurocalm checkin` first.");
        return Ok(());
    }

    let check_in = &state.check_in;
    println!("  Mood:      {}", check_in.mood_label());
    println!("  Sleep:     {}", check_in.sleep_label());
    println!("  Diet:      {}", check_in.diet);
    println!("  Exercise:  {}", check_in.exercise);
    println!("  Stressors: {}", check_in.stressors);
    println!("  Goals:     {}", state.user_goals);
    println!(
        "  Calm {} / Productivity {}",
        format!("{:.0}", state.scores.calm_index).green(),
        format!("{:.0}", state.scores.productivity_index).green()
    );

    if !state.recommendations.personalized.is_empty() {
        println!("\n{}", "🎯 Recommendations".bold());
        for rec in &state.recommendations.personalized {
            println!("  • {}", rec);
        }
    }

    println!(
        "\n💬 {} messages in conversation, {} days of history",
        state.chat_history.len(),
        state.score_history.len()
    );

    Ok(())
}

pub async fn handle_history(
    data_dir: Option<PathBuf>,
    user: String,
    days: Option<usize>,
) -> Result<()> {
    let (_, dashboard) = open(data_dir, None, None)?;
    let history = dashboard.history(&user, days).await?;

    if history.is_empty() {
        println!("No check-ins recorded yet.");
        return Ok(());
    }

    println!("{}", "📈 Score history".bold());
    println!("  {:<12} {:>6} {:>13}", "Date", "Calm", "Productivity");
    for item in history {
        println!(
            "  {:<12} {:>6.0} {:>13.0}",
            item.date.to_string(),
            item.scores.calm_index,
            item.scores.productivity_index
        );
    }

    Ok(())
}

pub async fn handle_insights(data_dir: Option<PathBuf>, user: String) -> Result<()> {
    let (_, dashboard) = open(data_dir, None, None)?;
    let insights = dashboard.insights(&user).await?;

    if insights.is_empty() {
        println!("Not enough check-ins for insights yet.");
        return Ok(());
    }

    for insight in insights {
        let icon = match insight.kind {
            InsightKind::Trend => "📊",
            InsightKind::Pattern => "🔗",
            InsightKind::Recommendation => "💡",
            InsightKind::Achievement => "🏆",
        };
        println!("{} {}", icon, insight.title.bold());
        println!("   {}", insight.description);
    }

    Ok(())
}

pub async fn handle_export(
    data_dir: Option<PathBuf>,
    user: String,
    format: String,
    output: Option<PathBuf>,
) -> Result<()> {
    let format: ExportFormat = format.parse()?;
    let (_, dashboard) = open(data_dir, None, None)?;
    let content = dashboard.export(&user, format).await?;

    match output {
        Some(path) => {
            std::fs::write(&path, content)?;
            println!("{} {}", "💾 Exported to".green(), path.display());
        }
        None => println!("{}", content),
    }

    Ok(())
}

pub async fn handle_reset(data_dir: Option<PathBuf>, user: String, yes: bool) -> Result<()> {
    if !yes {
        bail!("Refusing to delete data for {} without --yes", user);
    }

    let (_, dashboard) = open(data_dir, None, None)?;
    let removed = dashboard.reset(&user).await?;
    println!("{} {} records removed for {}", "🗑️".yellow(), removed, user);

    Ok(())
}

pub async fn handle_server(
    data_dir: Option<PathBuf>,
    host: Option<String>,
    port: Option<u16>,
    provider: Option<String>,
    model: Option<String>,
) -> Result<()> {
    let (mut config, dashboard) = open(data_dir, provider, model)?;
    if let Some(host) = host {
        config.server.host = host;
    }
    if let Some(port) = port {
        config.server.port = port;
    }

    println!(
        "{} http://{}:{}",
        "🚀 NeuroCalm API on".green().bold(),
        config.server.host,
        config.server.port
    );

    server::serve(&config, dashboard).await
}
