//! Localized report text.
//!
//! Only text that reaches the report sink is localized. Operator-facing
//! log lines stay in English and go through `tracing`.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use crate::types::{DailyStats, ProblematicMember};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Ru,
}

/// Report catalog for one language.
#[derive(Debug, Clone, Copy, Default)]
pub struct Messages {
    lang: Language,
}

impl Messages {
    pub fn new(lang: Language) -> Self {
        Self { lang }
    }

    pub fn language(&self) -> Language {
        self.lang
    }

    pub fn version_outdated(&self, name: &str, version: &str) -> String {
        match self.lang {
            Language::En => format!("🔧 {name}: outdated version ({version})"),
            Language::Ru => format!("🔧 {name}: старая версия ({version})"),
        }
    }

    pub fn version_updated(&self, name: &str, version: &str) -> String {
        match self.lang {
            Language::En => format!("✅ {name}: version updated to the latest ({version})"),
            Language::Ru => format!("✅ {name}: версия обновлена до актуальной ({version})"),
        }
    }

    pub fn never_online(&self, name: &str) -> String {
        match self.lang {
            Language::En => format!("❓ {name}: has never been online."),
            Language::Ru => format!("❓ {name}: ни разу не был в сети."),
        }
    }

    pub fn back_online(&self, name: &str) -> String {
        match self.lang {
            Language::En => format!("✅ {name}: is back online."),
            Language::Ru => format!("✅ {name}: снова в сети."),
        }
    }

    /// Offline alert for a tier; the icon and punctuation sharpen with the level.
    pub fn offline(&self, name: &str, level: u8, tier_seconds: i64) -> String {
        let icon = match level {
            0 | 1 => "⚠️",
            2 => "🚨",
            _ => "🆘",
        };
        let end = if level <= 1 { "." } else { "!" };
        let span = self.duration(tier_seconds);
        match self.lang {
            Language::En => format!("{icon} {name}: offline for more than {span}{end}"),
            Language::Ru => format!("{icon} {name}: офлайн более {span}{end}"),
        }
    }

    pub fn probe_reachable(&self, address: &str) -> String {
        match self.lang {
            Language::En => {
                format!("\n  (💡 Ping to {address} is successful. Controller might be down.)")
            }
            Language::Ru => {
                format!("\n  (💡 Пинг до {address} проходит. Возможен сбой контроллера.)")
            }
        }
    }

    pub fn probe_unreachable(&self, address: &str) -> String {
        match self.lang {
            Language::En => format!("\n  (❗️ Ping to {address} is failing. Node is unreachable.)"),
            Language::Ru => format!("\n  (❗️ Пинг до {address} не проходит. Узел недоступен.)"),
        }
    }

    pub fn findings(&self, reports: &[String]) -> String {
        let header = match self.lang {
            Language::En => "🔎 Problems detected with ZeroTier clients:\n\n",
            Language::Ru => "🔎 Обнаружены проблемы с клиентами ZeroTier:\n\n",
        };
        format!("{header}{}", reports.join("\n"))
    }

    pub fn members_fetch_failed(&self, network_id: &str, attempts: u32, error: &str) -> String {
        match self.lang {
            Language::En => format!(
                "⛔ Failed to get members for network {network_id} after {attempts} attempts. \
                 Last error: {error}"
            ),
            Language::Ru => format!(
                "⛔ Не удалось получить участников сети {network_id} после {attempts} попыток. \
                 Последняя ошибка: {error}"
            ),
        }
    }

    pub fn latest_version_fetch_failed(&self, attempts: u32, error: &str) -> String {
        match self.lang {
            Language::En => format!(
                "⛔ Failed to get the latest ZeroTier version after {attempts} attempts. \
                 Last error: {error}"
            ),
            Language::Ru => format!(
                "⛔ Не удалось получить последнюю версию ZeroTier после {attempts} попыток. \
                 Последняя ошибка: {error}"
            ),
        }
    }

    pub fn startup(&self, version: &str) -> String {
        match self.lang {
            Language::En => format!("🚀 ZeroTier Monitor (v{version}) started successfully."),
            Language::Ru => format!("🚀 Мониторинг ZeroTier (v{version}) успешно запущен."),
        }
    }

    pub fn shutdown(&self) -> String {
        match self.lang {
            Language::En => "🚧 ZeroTier Monitor stopped".to_string(),
            Language::Ru => "🚧 Мониторинг ZeroTier остановлен".to_string(),
        }
    }

    /// Summary sent once per day for the day that just ended.
    pub fn daily_report(&self, stats: &DailyStats, members: &[ProblematicMember]) -> String {
        let date = stats.report_date.format("%Y-%m-%d");
        let last_check = stats
            .last_check_at
            .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_else(|| "N/A".to_string());

        let mut out = String::new();
        match self.lang {
            Language::En => {
                let _ = write!(out, "🌙 Daily report for {date}:\n\n");
                out.push_str("✅ ZeroTier monitoring is running normally.\n");
                let _ = writeln!(out, "📈 Checks today: {}", stats.checks_today);
                let _ = writeln!(out, "⚠️ Incidents detected: {}", stats.problems_today);
                let _ = write!(out, "🕒 Last check: {last_check}");
            }
            Language::Ru => {
                let _ = write!(out, "🌙 Ежедневный отчет за {date}:\n\n");
                out.push_str("✅ Мониторинг ZeroTier работает в штатном режиме.\n");
                let _ = writeln!(out, "📈 Проверок за день: {}", stats.checks_today);
                let _ = writeln!(out, "⚠️ Выявлено инцидентов: {}", stats.problems_today);
                let _ = write!(out, "🕒 Последняя проверка: {last_check}");
            }
        }

        if !members.is_empty() {
            out.push_str(match self.lang {
                Language::En => "\n\n📊 Statistics for nodes with problems:",
                Language::Ru => "\n\n📊 Статистика по узлам с проблемами:",
            });
            for m in members {
                let _ = match self.lang {
                    Language::En => write!(out, "\n  - {}: {} incidents", m.name, m.problems_count),
                    Language::Ru => write!(out, "\n  - {}: {} инцидентов", m.name, m.problems_count),
                };
            }
        }
        out
    }

    /// Human span for a tier boundary, e.g. "15 minutes" or "1 часа".
    pub fn duration(&self, seconds: i64) -> String {
        let (n, unit) = if seconds >= 3600 && seconds % 3600 == 0 {
            (seconds / 3600, Unit::Hour)
        } else if seconds >= 60 && seconds % 60 == 0 {
            (seconds / 60, Unit::Minute)
        } else {
            (seconds, Unit::Second)
        };
        match self.lang {
            Language::En => {
                let word = match unit {
                    Unit::Hour => "hour",
                    Unit::Minute => "minute",
                    Unit::Second => "second",
                };
                if n == 1 {
                    format!("{n} {word}")
                } else {
                    format!("{n} {word}s")
                }
            }
            Language::Ru => {
                // Genitive after "более": singular for 1, 21, 31..., plural otherwise.
                let singular = n % 10 == 1 && n % 100 != 11;
                let word = match (unit, singular) {
                    (Unit::Hour, true) => "часа",
                    (Unit::Hour, false) => "часов",
                    (Unit::Minute, true) => "минуты",
                    (Unit::Minute, false) => "минут",
                    (Unit::Second, true) => "секунды",
                    (Unit::Second, false) => "секунд",
                };
                format!("{n} {word}")
            }
        }
    }
}

#[derive(Clone, Copy)]
enum Unit {
    Hour,
    Minute,
    Second,
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;

    #[test]
    fn offline_messages_follow_default_ladder() {
        let en = Messages::new(Language::En);
        assert_eq!(en.offline("nas", 1, 300), "⚠️ nas: offline for more than 5 minutes.");
        assert_eq!(en.offline("nas", 2, 900), "🚨 nas: offline for more than 15 minutes!");
        assert_eq!(en.offline("nas", 3, 3600), "🆘 nas: offline for more than 1 hour!");

        let ru = Messages::new(Language::Ru);
        assert_eq!(ru.offline("nas", 3, 3600), "🆘 nas: офлайн более 1 часа!");
        assert_eq!(ru.offline("nas", 1, 300), "⚠️ nas: офлайн более 5 минут.");
    }

    #[test]
    fn durations_pick_largest_whole_unit() {
        let en = Messages::new(Language::En);
        assert_eq!(en.duration(7200), "2 hours");
        assert_eq!(en.duration(90), "90 seconds");
        assert_eq!(en.duration(60), "1 minute");

        let ru = Messages::new(Language::Ru);
        assert_eq!(ru.duration(21 * 60), "21 минуты");
        assert_eq!(ru.duration(11 * 60), "11 минут");
        assert_eq!(ru.duration(45), "45 секунд");
    }

    #[test]
    fn findings_joins_reports_under_header() {
        let en = Messages::new(Language::En);
        let text = en.findings(&["a".to_string(), "b".to_string()]);
        assert!(text.starts_with("🔎 Problems detected"));
        assert!(text.ends_with("a\nb"));
    }

    #[test]
    fn daily_report_lists_problematic_members() {
        let mut stats = DailyStats::new(NaiveDate::from_ymd_opt(2026, 3, 1).unwrap());
        stats.checks_today = 288;
        stats.problems_today = 4;

        let members = vec![
            ProblematicMember {
                name: "nas".to_string(),
                problems_count: 3,
            },
            ProblematicMember {
                name: "laptop".to_string(),
                problems_count: 1,
            },
        ];

        let text = Messages::new(Language::En).daily_report(&stats, &members);
        assert!(text.contains("Daily report for 2026-03-01"));
        assert!(text.contains("Checks today: 288"));
        assert!(text.contains("Incidents detected: 4"));
        assert!(text.contains("Last check: N/A"));
        assert!(text.contains("\n  - nas: 3 incidents\n  - laptop: 1 incidents"));

        let quiet = Messages::new(Language::En).daily_report(&stats, &[]);
        assert!(!quiet.contains("Statistics for nodes"));
    }
}
