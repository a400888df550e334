use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use clap::{Parser, Subcommand};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use matchpoint::bracket::{create_match_skeleton, draw_size_for_entries, ResultPayload};
use matchpoint::calendar::{seeding_ranking_week, IsoWeek};
use matchpoint::draw::generate_draw_players;
use matchpoint::entry::{create_entry, EntryRequest};
use matchpoint::models::{
    AgeCategoryId, DrawId, DrawPlayer, Entry, GenderId, Match, MatchStatus, PlayerId,
    PointsHistoryRecord, ScoreCard, SeedAssignment, Tournament, TournamentCategory, TournamentId,
    WeeklyRankingRecord,
};
use matchpoint::parse_iso_week;
use matchpoint::ranking::{calculate_points_history, weekly_ranking};
use matchpoint::rules::RulesPolicy;
use matchpoint::schedule::schedule_match_dates;
use matchpoint::score::{validate, validate_draw_size, validate_player_schedule};
use matchpoint::seeding::{compute_actual_seeding_after_withdrawal, compute_planned_seeding};
use matchpoint::simulate::DrawSimulator;
use matchpoint::storage::{
    jsonl::{ranking_path, read_suspensions, read_tournaments, write_suspensions,
        write_tournaments},
    EntityType, JsonlReader, JsonlWriter, StorageConfig,
};

#[derive(Parser)]
#[command(name = "matchpoint")]
#[command(about = "Knockout tennis tournament engine: draws, results, rolling rankings")]
#[command(version)]
struct Cli {
    /// Path to a rules policy TOML file (defaults apply when omitted)
    #[arg(long)]
    rules: Option<String>,

    /// Data directory path
    #[arg(long, default_value = "./data")]
    data_dir: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Register a tournament
    AddTournament {
        #[arg(long)]
        id: TournamentId,

        #[arg(long)]
        name: String,

        /// Category: MT1000, MT700, MT400, MT200 or MT100
        #[arg(long)]
        category: String,

        /// ISO week the tournament is played in (e.g. "2026-W16")
        #[arg(long)]
        week: String,

        /// First day of play (YYYY-MM-DD)
        #[arg(long)]
        start_date: String,

        /// Last day of play (YYYY-MM-DD)
        #[arg(long)]
        end_date: String,
    },

    /// Enter a player into a tournament
    Enter {
        #[arg(long)]
        tournament: TournamentId,

        #[arg(long)]
        player: PlayerId,

        #[arg(long)]
        birth_year: i32,

        #[arg(long)]
        age_category: AgeCategoryId,

        #[arg(long)]
        gender: GenderId,

        /// Ranking points at entry time (drives bye allocation)
        #[arg(long, default_value = "0")]
        points: i64,

        /// Entry timestamp, RFC 3339 (default: now)
        #[arg(long)]
        at: Option<String>,
    },

    /// Build and publish the draw for one (tournament, age category, gender)
    Draw {
        #[arg(long)]
        tournament: TournamentId,

        #[arg(long)]
        age_category: AgeCategoryId,

        #[arg(long)]
        gender: GenderId,

        /// Random seed for reproducible draws
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Simulate a published draw through to its champion
    Simulate {
        #[arg(long)]
        tournament: TournamentId,

        #[arg(long)]
        age_category: AgeCategoryId,

        #[arg(long)]
        gender: GenderId,

        /// Random seed for reproducible simulations
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Record one match result
    Result {
        #[arg(long)]
        tournament: TournamentId,

        #[arg(long)]
        match_id: i64,

        /// completed, walkover, retired, disqualified or cancelled
        #[arg(long)]
        status: String,

        #[arg(long)]
        winner: PlayerId,

        /// Scoreline, e.g. "7-6(7-5) 6-2" or "6-4 4-6 [10-7]"
        #[arg(long, default_value = "")]
        score: String,
    },

    /// Compute points history for a finished tournament
    Points {
        #[arg(long)]
        tournament: TournamentId,
    },

    /// Publish the weekly ranking for an ISO week (e.g. "2026-W20")
    Rank {
        #[arg(long)]
        week: String,
    },

    /// Validate stored scorelines and schedules for a tournament
    Validate {
        #[arg(long)]
        tournament: TournamentId,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let policy = match &cli.rules {
        Some(path) => RulesPolicy::from_file(path)?,
        None => RulesPolicy::default(),
    };
    let storage = StorageConfig::new(PathBuf::from(&cli.data_dir));

    match cli.command {
        Commands::AddTournament {
            id,
            name,
            category,
            week,
            start_date,
            end_date,
        } => {
            let category = parse_category(&category)
                .with_context(|| format!("unknown category: {category}"))?;
            let week = parse_iso_week(&week)
                .with_context(|| format!("invalid ISO week: {week}"))?;
            let start_date = parse_date(&start_date)?;
            let end_date = parse_date(&end_date)?;

            let mut tournaments = read_tournaments(&storage)?;
            if tournaments.iter().any(|t| t.tournament_id == id) {
                bail!("tournament {id} already registered");
            }
            tournaments.push(Tournament {
                tournament_id: id,
                name: name.clone(),
                category,
                year: week.year,
                week: week.week,
                start_date,
                end_date,
            });
            write_tournaments(&storage, &mut tournaments)?;
            println!(
                "Registered tournament {id}: {name} ({}-W{:02})",
                week.year, week.week
            );
        }

        Commands::Enter {
            tournament,
            player,
            birth_year,
            age_category,
            gender,
            points,
            at,
        } => {
            let entry_timestamp = match at {
                Some(s) => DateTime::parse_from_rfc3339(&s)
                    .with_context(|| format!("invalid --at timestamp: {s}"))?
                    .with_timezone(&Utc),
                None => Utc::now(),
            };
            let tournaments = read_tournaments(&storage)?;
            let suspensions = read_suspensions(&storage)?;
            let existing: Vec<Entry> =
                JsonlReader::for_entity(&storage, EntityType::Entry, tournament).read_all()?;

            let entry = create_entry(
                &EntryRequest {
                    tournament_id: tournament,
                    player_id: player,
                    birth_year,
                    age_category_id: age_category,
                    gender_id: gender,
                    entry_points: points,
                    entry_timestamp,
                },
                &tournaments,
                &policy.age_categories,
                &suspensions,
                &existing,
                &policy.timing,
            )?;

            JsonlWriter::for_entity(&storage, EntityType::Entry, tournament).append(&entry)?;
            println!(
                "Entry accepted: player {player} in tournament {tournament} \
                 (category {age_category}, {points} pts)"
            );
        }

        Commands::Draw {
            tournament,
            age_category,
            gender,
            seed,
        } => {
            let t = find_tournament(&storage, tournament)?;
            let entries = read_draw_entries(&storage, tournament, age_category, gender)?;
            validate_draw_size(entries.len() as u32)?;

            let draw_id = draw_id_for(tournament, age_category, gender);
            let draw_size = draw_size_for_entries(entries.len() as u32);
            let num_seeds = policy.seeding.seeds_for_draw_size(draw_size)?;
            let rankings = seeding_rankings(&storage, &t, age_category, gender, &entries)?;

            let mut rng = make_rng(seed);
            let simulator = DrawSimulator::new(&policy);
            let withdrawn = simulator.pick_pre_draw_withdrawal(&entries, &mut rng);

            let planned = compute_planned_seeding(draw_id, &rankings, draw_size, &policy.seeding)?;
            let mut snapshot = planned.clone();
            if let Some(player_id) = withdrawn {
                println!("Pre-draw withdrawal: player {player_id}");
                if let Some(actual) = compute_actual_seeding_after_withdrawal(
                    draw_id,
                    &planned,
                    player_id,
                    &rankings,
                    draw_size,
                    &policy.seeding,
                )? {
                    snapshot.extend(actual);
                }
            }

            let players = generate_draw_players(
                draw_id,
                &entries,
                draw_size,
                num_seeds,
                withdrawn,
                &snapshot,
                &mut rng,
            )?;
            let mut matches =
                create_match_skeleton(draw_id, &players, t.start_date, first_match_id(draw_id))?;
            schedule_match_dates(&mut matches, t.start_date);

            replace_draw_rows(&storage, EntityType::SeedAssignment, tournament, snapshot, |s: &SeedAssignment| s.draw_id != draw_id)?;
            replace_draw_rows(&storage, EntityType::DrawPlayer, tournament, players.clone(), |p: &DrawPlayer| p.draw_id != draw_id)?;
            replace_draw_rows(&storage, EntityType::Match, tournament, matches.clone(), |m: &Match| m.draw_id != draw_id)?;

            println!(
                "Draw {draw_id} published: {} players in a {draw_size}-slot bracket, \
                 {num_seeds} seeds, {} matches",
                players.len(),
                matches.len()
            );
        }

        Commands::Simulate {
            tournament,
            age_category,
            gender,
            seed,
        } => {
            let t = find_tournament(&storage, tournament)?;
            let draw_id = draw_id_for(tournament, age_category, gender);
            let players: Vec<DrawPlayer> =
                JsonlReader::for_entity(&storage, EntityType::DrawPlayer, tournament)
                    .read_where(|p: &DrawPlayer| p.draw_id == draw_id)?;
            if players.is_empty() {
                bail!("no draw published for draw {draw_id}; run `draw` first");
            }

            let entries = read_draw_entries(&storage, tournament, age_category, gender)?;
            let has_super_tiebreak = policy.has_super_tiebreak(age_category, gender)?;
            let rankings = seeding_rankings(&storage, &t, age_category, gender, &entries)?;
            let rankings = if rankings.is_empty() {
                None
            } else {
                Some(rankings)
            };

            let mut rng = make_rng(seed);
            let simulator = DrawSimulator::new(&policy);
            let outcome = simulator.simulate_draw(
                draw_id,
                tournament,
                &players,
                t.start_date,
                has_super_tiebreak,
                first_match_id(draw_id),
                rankings.as_ref(),
                &mut rng,
            )?;

            let champion = outcome
                .matches
                .iter()
                .max_by_key(|m| m.round_id)
                .and_then(|m| m.winner_id);

            let side = |p: Option<PlayerId>| match p {
                Some(id) => id.to_string(),
                None => "Bye".to_string(),
            };
            for m in &outcome.matches {
                println!(
                    "  R{} M{}: {} vs {} — {:?} {}",
                    m.round_id,
                    m.match_number,
                    side(m.player1_id),
                    side(m.player2_id),
                    m.status,
                    m.score
                );
            }

            replace_draw_rows(&storage, EntityType::Match, tournament, outcome.matches, |m: &Match| m.draw_id != draw_id)?;
            append_new_suspensions(&storage, outcome.suspensions)?;

            match champion {
                Some(player_id) => println!("Draw {draw_id} simulated; champion: player {player_id}"),
                None => println!("Draw {draw_id} simulated; no champion decided"),
            }
        }

        Commands::Result {
            tournament,
            match_id,
            status,
            winner,
            score,
        } => {
            let status = parse_status(&status)
                .with_context(|| format!("unknown status: {status}"))?;
            let score = ScoreCard::parse(&score)
                .with_context(|| format!("unparseable scoreline: {score:?}"))?;

            let mut matches: Vec<Match> =
                JsonlReader::for_entity(&storage, EntityType::Match, tournament).read_all()?;
            let draw_id = matches
                .iter()
                .find(|m| m.match_id == match_id)
                .map(|m| m.draw_id)
                .with_context(|| format!("match {match_id} not found in tournament {tournament}"))?;

            let existing_suspensions = read_suspensions(&storage)?;
            let applied = matchpoint::bracket::apply_result(
                &mut matches,
                draw_id,
                tournament,
                &ResultPayload {
                    match_id,
                    status,
                    winner_id: winner,
                    score,
                },
                &existing_suspensions,
                &policy.discipline,
            )?;

            JsonlWriter::for_entity(&storage, EntityType::Match, tournament)
                .write_all(&matches)?;
            if let Some(suspension) = applied.new_suspension {
                println!(
                    "Player {} suspended until {}",
                    suspension.player_id, suspension.suspension_end
                );
                append_new_suspensions(&storage, vec![suspension])?;
            }
            match applied.advanced_to {
                Some((round_id, match_number, _)) => println!(
                    "Result recorded; player {winner} advances to round {round_id} match {match_number}"
                ),
                None => println!("Result recorded; player {winner} wins the draw"),
            }
        }

        Commands::Points { tournament } => {
            let t = find_tournament(&storage, tournament)?;
            let matches: Vec<Match> =
                JsonlReader::for_entity(&storage, EntityType::Match, tournament).read_all()?;
            let players: Vec<DrawPlayer> =
                JsonlReader::for_entity(&storage, EntityType::DrawPlayer, tournament).read_all()?;
            let entries: Vec<Entry> =
                JsonlReader::for_entity(&storage, EntityType::Entry, tournament).read_all()?;

            let category_of: HashMap<PlayerId, AgeCategoryId> = entries
                .iter()
                .map(|e| (e.player_id, e.age_category_id))
                .collect();

            let mut draw_ids: Vec<DrawId> = players.iter().map(|p| p.draw_id).collect();
            draw_ids.sort_unstable();
            draw_ids.dedup();

            let mut records: Vec<PointsHistoryRecord> = Vec::new();
            for draw_id in draw_ids {
                let draw_player_ids: Vec<PlayerId> = players
                    .iter()
                    .filter(|p| p.draw_id == draw_id)
                    .map(|p| p.player_id)
                    .collect();
                let age_category_id = draw_player_ids
                    .first()
                    .and_then(|p| category_of.get(p))
                    .copied()
                    .with_context(|| format!("no entry found for draw {draw_id}"))?;
                records.extend(calculate_points_history(
                    draw_id,
                    &t,
                    age_category_id,
                    &matches,
                    &draw_player_ids,
                    &policy,
                ));
            }

            JsonlWriter::for_entity(&storage, EntityType::PointsHistory, tournament)
                .write_all(&records)?;
            println!(
                "Points history written: {} records for tournament {tournament}",
                records.len()
            );
        }

        Commands::Rank { week } => {
            let week = parse_iso_week(&week)
                .with_context(|| format!("invalid ISO week: {week}"))?;
            let tournaments = read_tournaments(&storage)?;
            let tournament_weeks: HashMap<TournamentId, IsoWeek> = tournaments
                .iter()
                .map(|t| (t.tournament_id, IsoWeek::new(t.year, t.week)))
                .collect();

            let mut history: Vec<PointsHistoryRecord> = Vec::new();
            let mut player_gender: HashMap<PlayerId, GenderId> = HashMap::new();
            for t in &tournaments {
                history.extend(
                    JsonlReader::<PointsHistoryRecord>::for_entity(
                        &storage,
                        EntityType::PointsHistory,
                        t.tournament_id,
                    )
                    .read_all()?,
                );
                let entries: Vec<Entry> =
                    JsonlReader::for_entity(&storage, EntityType::Entry, t.tournament_id)
                        .read_all()?;
                for e in entries {
                    player_gender.insert(e.player_id, e.gender_id);
                }
            }

            let rankings =
                weekly_ranking(week, &history, &tournament_weeks, &player_gender, &policy.ranking)?;
            JsonlWriter::new(ranking_path(&storage, week)).write_all(&rankings)?;

            println!(
                "Ranking {}-W{:02}: {} players ranked",
                week.year,
                week.week,
                rankings.len()
            );
            let mut rows: Vec<&WeeklyRankingRecord> = rankings.iter().collect();
            rows.sort_by_key(|r| (r.age_category_id, r.gender_id, r.rank_position));
            for r in rows {
                println!(
                    "  cat {} gender {}  #{:<3} player {:<6} {} pts",
                    r.age_category_id, r.gender_id, r.rank_position, r.player_id, r.total_points
                );
            }
        }

        Commands::Validate { tournament } => {
            let matches: Vec<Match> =
                JsonlReader::for_entity(&storage, EntityType::Match, tournament).read_all()?;
            let mut violations: Vec<String> = Vec::new();

            for m in &matches {
                for error in validate(&m.score, m.status).errors {
                    violations.push(format!("match {}: {error}", m.match_id));
                }
            }

            let mut draw_ids: Vec<DrawId> = matches.iter().map(|m| m.draw_id).collect();
            draw_ids.sort_unstable();
            draw_ids.dedup();
            for draw_id in draw_ids {
                let draw_matches: Vec<Match> = matches
                    .iter()
                    .filter(|m| m.draw_id == draw_id)
                    .cloned()
                    .collect();
                for error in validate_player_schedule(&draw_matches).errors {
                    violations.push(format!("draw {draw_id}: {error}"));
                }
            }

            if violations.is_empty() {
                println!("Tournament {tournament}: {} matches, all valid", matches.len());
            } else {
                println!("Tournament {tournament}: {} violations", violations.len());
                for v in &violations {
                    println!("  {v}");
                }
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

/// One bracket per (tournament, age category, gender); ids are composed so
/// re-running a command targets the same draw.
fn draw_id_for(
    tournament_id: TournamentId,
    age_category_id: AgeCategoryId,
    gender_id: GenderId,
) -> DrawId {
    tournament_id * 100 + age_category_id * 10 + gender_id
}

fn first_match_id(draw_id: DrawId) -> i64 {
    draw_id * 1000 + 1
}

fn make_rng(seed: Option<u64>) -> ChaCha8Rng {
    match seed {
        Some(seed) => ChaCha8Rng::seed_from_u64(seed),
        None => ChaCha8Rng::from_entropy(),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .with_context(|| format!("invalid date (expected YYYY-MM-DD): {s}"))
}

fn parse_category(s: &str) -> Option<TournamentCategory> {
    match s.to_ascii_uppercase().as_str() {
        "MT1000" => Some(TournamentCategory::MT1000),
        "MT700" => Some(TournamentCategory::MT700),
        "MT400" => Some(TournamentCategory::MT400),
        "MT200" => Some(TournamentCategory::MT200),
        "MT100" => Some(TournamentCategory::MT100),
        _ => None,
    }
}

fn parse_status(s: &str) -> Option<MatchStatus> {
    match s.to_ascii_lowercase().as_str() {
        "completed" => Some(MatchStatus::Completed),
        "walkover" => Some(MatchStatus::Walkover),
        "retired" => Some(MatchStatus::Retired),
        "disqualified" => Some(MatchStatus::Disqualified),
        "cancelled" => Some(MatchStatus::Cancelled),
        _ => None,
    }
}

fn find_tournament(storage: &StorageConfig, tournament_id: TournamentId) -> Result<Tournament> {
    read_tournaments(storage)?
        .into_iter()
        .find(|t| t.tournament_id == tournament_id)
        .with_context(|| format!("tournament {tournament_id} not registered"))
}

fn read_draw_entries(
    storage: &StorageConfig,
    tournament_id: TournamentId,
    age_category_id: AgeCategoryId,
    gender_id: GenderId,
) -> Result<Vec<Entry>> {
    let entries = JsonlReader::for_entity(storage, EntityType::Entry, tournament_id)
        .read_where(|e: &Entry| {
            e.age_category_id == age_category_id && e.gender_id == gender_id
        })?;
    Ok(entries)
}

/// Rankings used for seeding: the published snapshot for week W-1 when one
/// exists, otherwise entry points stand in.
fn seeding_rankings(
    storage: &StorageConfig,
    tournament: &Tournament,
    age_category_id: AgeCategoryId,
    gender_id: GenderId,
    entries: &[Entry],
) -> Result<HashMap<PlayerId, u32>> {
    let week = seeding_ranking_week(IsoWeek::new(tournament.year, tournament.week))?;
    let published: Vec<WeeklyRankingRecord> = JsonlReader::new(ranking_path(storage, week))
        .read_where(|r: &WeeklyRankingRecord| {
            r.age_category_id == age_category_id && r.gender_id == gender_id
        })?;

    if !published.is_empty() {
        return Ok(published
            .into_iter()
            .map(|r| (r.player_id, r.rank_position))
            .collect());
    }

    tracing::info!(
        year = week.year,
        week = week.week,
        "no published ranking for the seeding week, ranking entrants by entry points"
    );
    let mut by_points: Vec<&Entry> = entries.iter().collect();
    by_points.sort_by_key(|e| (std::cmp::Reverse(e.entry_points), e.player_id));
    Ok(by_points
        .into_iter()
        .enumerate()
        .map(|(i, e)| (e.player_id, i as u32 + 1))
        .collect())
}

/// Replace one draw's rows inside a tournament-level file, keeping the rest.
fn replace_draw_rows<T, F>(
    storage: &StorageConfig,
    entity: EntityType,
    tournament_id: TournamentId,
    new_rows: Vec<T>,
    keep: F,
) -> Result<()>
where
    T: serde::Serialize + serde::de::DeserializeOwned,
    F: Fn(&T) -> bool,
{
    let mut rows: Vec<T> =
        JsonlReader::for_entity(storage, entity, tournament_id).read_where(keep)?;
    rows.extend(new_rows);
    JsonlWriter::for_entity(storage, entity, tournament_id).write_all(&rows)?;
    Ok(())
}

/// Append suspensions the register does not already hold.
fn append_new_suspensions(
    storage: &StorageConfig,
    produced: Vec<matchpoint::models::PlayerSuspension>,
) -> Result<()> {
    let mut register = read_suspensions(storage)?;
    let known: HashSet<_> = register.iter().map(|s| s.natural_key()).collect();
    let mut added = 0;
    for suspension in produced {
        if !known.contains(&suspension.natural_key()) {
            register.push(suspension);
            added += 1;
        }
    }
    if added > 0 {
        write_suspensions(storage, &mut register)?;
    }
    Ok(())
}
