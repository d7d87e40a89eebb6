use rand::Rng;
use serde::Deserialize;

use crate::models::Sport;

/// Everything the pipeline needs to know about covering one sport.
#[derive(Debug, Clone, Deserialize)]
pub struct SportProfile {
    pub sport: Sport,
    /// Search terms for the structured search, synonyms OR-ed together.
    pub query: String,
    #[serde(default)]
    pub feeds: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_weight")]
    pub weight: u32,
}

fn default_weight() -> u32 {
    1
}

#[derive(Debug, Clone)]
pub struct SportCatalog {
    profiles: Vec<SportProfile>,
}

impl SportCatalog {
    pub fn new(profiles: Vec<SportProfile>) -> Self {
        SportCatalog { profiles }
    }

    pub fn profile(&self, sport: Sport) -> Option<&SportProfile> {
        self.profiles.iter().find(|p| p.sport == sport)
    }

    pub fn profiles(&self) -> &[SportProfile] {
        &self.profiles
    }

    /// Draw up to `count` distinct sports by weight, without replacement.
    /// Zero-weight sports are never drawn.
    pub fn weighted_order<R: Rng + ?Sized>(&self, rng: &mut R, count: usize) -> Vec<Sport> {
        let mut pool: Vec<(Sport, u64)> = self
            .profiles
            .iter()
            .filter(|p| p.weight > 0)
            .map(|p| (p.sport, u64::from(p.weight)))
            .collect();
        let mut order = Vec::with_capacity(count.min(pool.len()));

        while order.len() < count && !pool.is_empty() {
            let total: u64 = pool.iter().map(|(_, w)| w).sum();
            let mut ticket = rng.random_range(0..total);
            let idx = pool
                .iter()
                .position(|(_, w)| {
                    if ticket < *w {
                        true
                    } else {
                        ticket -= w;
                        false
                    }
                })
                .unwrap_or(pool.len() - 1);
            order.push(pool.remove(idx).0);
        }

        order
    }
}

impl Default for SportCatalog {
    fn default() -> Self {
        let p = |sport, query: &str, feeds: &[&str], tags: &[&str], weight| SportProfile {
            sport,
            query: query.to_string(),
            feeds: feeds.iter().map(|s| s.to_string()).collect(),
            tags: tags.iter().map(|s| s.to_string()).collect(),
            weight,
        };

        SportCatalog::new(vec![
            p(
                Sport::Soccer,
                "football OR soccer",
                &[
                    "https://feeds.bbci.co.uk/sport/football/rss.xml",
                    "https://www.espn.com/espn/rss/soccer/news",
                ],
                &["#Football", "#GameDay"],
                5,
            ),
            p(
                Sport::Basketball,
                "basketball OR NBA",
                &[
                    "https://www.espn.com/espn/rss/nba/news",
                    "https://www.theguardian.com/sport/nba/rss",
                ],
                &["#NBA", "#BallIsLife"],
                3,
            ),
            p(
                Sport::Tennis,
                "tennis",
                &[
                    "https://feeds.bbci.co.uk/sport/tennis/rss.xml",
                    "https://www.theguardian.com/sport/tennis/rss",
                ],
                &["#Tennis", "#GrandSlam"],
                2,
            ),
            p(
                Sport::Mma,
                "MMA OR UFC OR \"mixed martial arts\"",
                &[
                    "https://www.espn.com/espn/rss/mma/news",
                    "https://www.theguardian.com/sport/ufc/rss",
                ],
                &["#UFC", "#FightNight"],
                2,
            ),
            p(
                Sport::Formula1,
                "\"Formula One\" OR \"Formula 1\" OR F1",
                &[
                    "https://feeds.bbci.co.uk/sport/formula1/rss.xml",
                    "https://www.theguardian.com/sport/formulaone/rss",
                ],
                &["#F1", "#PolePosition"],
                2,
            ),
            p(
                Sport::Boxing,
                "boxing",
                &[
                    "https://feeds.bbci.co.uk/sport/boxing/rss.xml",
                    "https://www.theguardian.com/sport/boxing/rss",
                ],
                &["#Boxing", "#FightGame"],
                2,
            ),
            p(
                Sport::Cricket,
                "cricket",
                &[
                    "https://feeds.bbci.co.uk/sport/cricket/rss.xml",
                    "https://www.theguardian.com/sport/cricket/rss",
                ],
                &["#Cricket", "#Powerplay"],
                2,
            ),
            p(
                Sport::Rugby,
                "\"rugby union\" OR \"rugby league\" OR rugby",
                &[
                    "https://feeds.bbci.co.uk/sport/rugby-union/rss.xml",
                    "https://www.theguardian.com/sport/rugby-union/rss",
                ],
                &["#Rugby", "#ScrumDown"],
                1,
            ),
            p(
                Sport::Golf,
                "golf",
                &[
                    "https://feeds.bbci.co.uk/sport/golf/rss.xml",
                    "https://www.theguardian.com/sport/golf/rss",
                ],
                &["#Golf", "#TeeTime"],
                1,
            ),
            p(
                Sport::Baseball,
                "baseball OR MLB",
                &[
                    "https://www.espn.com/espn/rss/mlb/news",
                    "https://www.theguardian.com/sport/baseball/rss",
                ],
                &["#MLB", "#PlayBall"],
                1,
            ),
            p(
                Sport::Cycling,
                "cycling OR \"Tour de France\"",
                &[
                    "https://feeds.bbci.co.uk/sport/cycling/rss.xml",
                    "https://www.theguardian.com/sport/cycling/rss",
                ],
                &["#Cycling", "#PelotonPower"],
                1,
            ),
            p(
                Sport::Hockey,
                "\"ice hockey\" OR hockey OR NHL",
                &[
                    "https://www.espn.com/espn/rss/nhl/news",
                    "https://www.theguardian.com/sport/nhl/rss",
                ],
                &["#NHL", "#PuckDrop"],
                2,
            ),
            p(
                Sport::Esports,
                "esports OR \"e-sports\"",
                &["https://www.theguardian.com/games/esports/rss"],
                &["#Esports", "#GG"],
                1,
            ),
        ])
    }
}
