use chrono::NaiveDate;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ForecastError, Result};
use crate::http_cache::fetch_csv_cached;
use crate::match_record::Match;
use crate::outcome::Outcome;
use crate::store_util::{atomic_write_json, load_json_or_default, store_path};
use crate::team_names::TeamNameResolver;

/// Short league codes for the historical CSV source (spec §6).
pub fn league_code(league: &str) -> Option<&'static str> {
    match league {
        "EPL" => Some("E0"),
        "La_Liga" => Some("SP1"),
        "Bundesliga" => Some("D1"),
        "Serie_A" => Some("I1"),
        "Ligue_1" => Some("F1"),
        _ => None,
    }
}

fn csv_url(host: &str, season: &str, league: &str) -> Option<String> {
    league_code(league).map(|code| format!("https://{host}/mmz4281/{season}/{code}.csv"))
}

const DEFAULT_HOST: &str = "www.football-data.co.uk";

#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date")]
    date: Option<String>,
    #[serde(rename = "HomeTeam")]
    home_team: Option<String>,
    #[serde(rename = "AwayTeam")]
    away_team: Option<String>,
    #[serde(rename = "FTHG")]
    fthg: Option<String>,
    #[serde(rename = "FTAG")]
    ftag: Option<String>,
    #[serde(rename = "FTR")]
    ftr: Option<String>,
    #[serde(rename = "HS")]
    hs: Option<f64>,
    #[serde(rename = "AS")]
    aws: Option<f64>,
    #[serde(rename = "HST")]
    hst: Option<f64>,
    #[serde(rename = "AST")]
    ast: Option<f64>,
    #[serde(rename = "B365H")]
    b365h: Option<f64>,
    #[serde(rename = "B365D")]
    b365d: Option<f64>,
    #[serde(rename = "B365A")]
    b365a: Option<f64>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheEntry {
    matches: Vec<Match>,
}

/// Fetches and parses one (league, season) CSV, counting unparseable rows
/// rather than aborting the batch (spec §4.1).
fn parse_csv(body: &str, resolver: &dyn TeamNameResolver) -> (Vec<Match>, usize) {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut matches = Vec::new();
    let mut skipped = 0usize;

    for record in reader.deserialize::<CsvRow>() {
        let Ok(row) = record else {
            skipped += 1;
            continue;
        };

        let parsed = (|| -> Option<Match> {
            let home_raw = row.home_team?;
            let away_raw = row.away_team?;
            let home = resolver.resolve(&home_raw).unwrap_or(home_raw);
            let away = resolver.resolve(&away_raw).unwrap_or(away_raw);
            let h_goals: u32 = row.fthg?.trim().parse().ok()?;
            let a_goals: u32 = row.ftag?.trim().parse().ok()?;
            let result = match row.ftr?.trim() {
                "H" => Outcome::Home,
                "D" => Outcome::Draw,
                "A" => Outcome::Away,
                _ => return None,
            };
            let date = row
                .date
                .as_deref()
                .and_then(|d| {
                    NaiveDate::parse_from_str(d, "%d/%m/%Y")
                        .or_else(|_| NaiveDate::parse_from_str(d, "%d/%m/%y"))
                        .ok()
                })
                .unwrap_or_else(|| NaiveDate::from_ymd_opt(1970, 1, 1).unwrap());

            Some(Match {
                date,
                league: String::new(),
                season: String::new(),
                home,
                away,
                h_goals,
                a_goals,
                result,
                h_shots: row.hs.unwrap_or(0.0),
                a_shots: row.aws.unwrap_or(0.0),
                h_sot: row.hst.unwrap_or(0.0),
                a_sot: row.ast.unwrap_or(0.0),
                odds_h: row.b365h.unwrap_or(0.0),
                odds_d: row.b365d.unwrap_or(0.0),
                odds_a: row.b365a.unwrap_or(0.0),
            })
        })();

        match parsed {
            Some(m) => matches.push(m),
            None => skipped += 1,
        }
    }

    (matches, skipped)
}

fn cache_file_name(league: &str, season: &str) -> String {
    format!("matches_{league}_{season}.json")
}

/// Loads the ordered, date-ascending match history for a set of
/// (league, season) pairs (spec §4.1 contract). Falls back to the local
/// cache per pair when `use_cache` is set or a fetch fails; returns an
/// error only when every fetch failed and no cache exists for any pair.
pub fn load_matches(
    client: &Client,
    host: &str,
    leagues: &[&str],
    seasons: &[&str],
    use_cache: bool,
    resolver: &dyn TeamNameResolver,
) -> Result<Vec<Match>> {
    let host = if host.is_empty() { DEFAULT_HOST } else { host };
    let mut all = Vec::new();
    let mut any_success = false;

    for &league in leagues {
        for &season in seasons {
            let file_name = cache_file_name(league, season);
            let path = store_path(&file_name);

            if use_cache {
                if let Some(path) = &path {
                    let cached: CacheEntry = load_json_or_default(path);
                    if !cached.matches.is_empty() {
                        all.extend(cached.matches);
                        any_success = true;
                        continue;
                    }
                }
            }

            let Some(url) = csv_url(host, season, league) else {
                warn!(league, "unknown league code, skipping");
                continue;
            };

            match fetch_csv_cached(client, &url) {
                Ok(body) => {
                    let (mut parsed, skipped) = parse_csv(&body, resolver);
                    if skipped > 0 {
                        warn!(league, season, skipped, "skipped unparseable CSV rows");
                    }
                    for m in &mut parsed {
                        m.league = league.to_string();
                        m.season = season.to_string();
                    }
                    if !parsed.is_empty() {
                        any_success = true;
                        if let Some(path) = &path {
                            let _ = atomic_write_json(path, &CacheEntry { matches: parsed.clone() });
                        }
                        all.extend(parsed);
                    }
                }
                Err(e) => {
                    warn!(league, season, error = %e, "fetch failed, checking cache");
                    if let Some(path) = &path {
                        let cached: CacheEntry = load_json_or_default(path);
                        if !cached.matches.is_empty() {
                            any_success = true;
                            all.extend(cached.matches);
                        }
                    }
                }
            }
        }
    }

    if !any_success {
        return Err(ForecastError::Fatal(
            "all fetches failed and no cache exists for any requested league/season".into(),
        ));
    }

    all.sort_by_key(|m| m.date);
    Ok(all)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::team_names::IdentityResolver;

    const SAMPLE: &str = "Date,HomeTeam,AwayTeam,FTHG,FTAG,FTR,HS,AS,HST,AST,B365H,B365D,B365A\n\
01/08/2023,Arsenal,Chelsea,2,1,H,14,9,6,3,1.9,3.6,4.2\n\
bad,row,here,,,,,,,,,,\n\
08/08/2023,Chelsea,Arsenal,0,0,D,8,8,3,2,2.4,3.2,3.0\n";

    #[test]
    fn lenient_parse_skips_unparseable_rows_and_counts_them() {
        let (matches, skipped) = parse_csv(SAMPLE, &IdentityResolver);
        assert_eq!(matches.len(), 2);
        assert_eq!(skipped, 1);
        assert_eq!(matches[0].home, "Arsenal");
        assert_eq!(matches[0].result, Outcome::Home);
    }

    #[test]
    fn league_code_table_matches_the_external_interface_contract() {
        assert_eq!(league_code("EPL"), Some("E0"));
        assert_eq!(league_code("La_Liga"), Some("SP1"));
        assert_eq!(league_code("unknown"), None);
    }
}
