use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
#[error("unknown value: {0}")]
pub struct UnknownVariant(pub String);

/// A closed set of string values stored in VARCHAR columns and exchanged as JSON strings.
pub trait Choice: Sized + Copy + FromStr + 'static {
    const ALL: &'static [Self];

    fn as_str(&self) -> &'static str;

    fn choices() -> String {
        Self::ALL
            .iter()
            .map(|choice| choice.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl Choice for $name {
            const ALL: &'static [$name] = &[$($name::$variant),+];

            fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(UnknownVariant(s.to_string())),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

string_enum!(ResourceType {
    Person => "person",
    Machine => "machine",
    Vehicle => "vehicle",
});

string_enum!(
    /// Departments of the workshop, in board order.
    Department {
        Zuschnitt => "zuschnitt",
        Cnc => "cnc",
        Produktion => "produktion",
        Behandlung => "behandlung",
        Beschlaege => "beschlaege",
        Transport => "transport",
        Montage => "montage",
        Buero => "buero",
    }
);

impl Department {
    /// Production phases a task runs through, in order. The office is not a phase.
    pub const PHASES: [Department; 7] = [
        Department::Zuschnitt,
        Department::Cnc,
        Department::Produktion,
        Department::Behandlung,
        Department::Beschlaege,
        Department::Transport,
        Department::Montage,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Department::Zuschnitt => "Zuschnitt",
            Department::Cnc => "CNC",
            Department::Produktion => "Produktion",
            Department::Behandlung => "Behandlung",
            Department::Beschlaege => "Beschläge",
            Department::Transport => "Transport",
            Department::Montage => "Montage",
            Department::Buero => "Büro",
        }
    }

    pub fn is_phase(&self) -> bool {
        Department::PHASES.contains(self)
    }

    pub fn phase_rank(&self) -> usize {
        Department::PHASES
            .iter()
            .position(|phase| phase == self)
            .unwrap_or(Department::PHASES.len())
    }
}

string_enum!(EmployeeType {
    Internal => "internal",
    Temporary => "temporary",
    ExternalFirm => "external_firm",
    Pensioner => "pensioner",
    Apprentice => "apprentice",
});

string_enum!(HalfDay {
    Morning => "morning",
    Afternoon => "afternoon",
    FullDay => "full_day",
});

impl HalfDay {
    pub fn covers_morning(&self) -> bool {
        matches!(self, HalfDay::Morning | HalfDay::FullDay)
    }

    pub fn covers_afternoon(&self) -> bool {
        matches!(self, HalfDay::Afternoon | HalfDay::FullDay)
    }

    /// Two slots on the same day collide when they share a half.
    pub fn overlaps(&self, other: HalfDay) -> bool {
        (self.covers_morning() && other.covers_morning())
            || (self.covers_afternoon() && other.covers_afternoon())
    }

    /// The concrete halves this slot occupies.
    pub fn halves(&self) -> &'static [HalfDay] {
        match self {
            HalfDay::Morning => &[HalfDay::Morning],
            HalfDay::Afternoon => &[HalfDay::Afternoon],
            HalfDay::FullDay => &[HalfDay::Morning, HalfDay::Afternoon],
        }
    }

    pub fn hours(&self, daily_hours: f64) -> f64 {
        match self {
            HalfDay::Morning | HalfDay::Afternoon => daily_hours * 0.5,
            HalfDay::FullDay => daily_hours,
        }
    }
}

string_enum!(StatusCode {
    Assigned => "assigned",
    Available => "available",
    Sick => "sick",
    Vacation => "vacation",
    Training => "training",
    Other => "other",
});

string_enum!(TaskStatus {
    Planned => "planned",
    InProgress => "in_progress",
    Blocked => "blocked",
    Done => "done",
});

string_enum!(DependencyType {
    FinishStart => "finish_start",
    StartStart => "start_start",
    FinishFinish => "finish_finish",
});

string_enum!(PendenzBereich {
    Avor => "avor",
    Montage => "montage",
    Planung => "planung",
    Material => "material",
});

string_enum!(PendenzPrioritaet {
    Hoch => "hoch",
    Mittel => "mittel",
    Niedrig => "niedrig",
});

string_enum!(PendenzStatus {
    Offen => "offen",
    InArbeit => "in_arbeit",
    Erledigt => "erledigt",
});

string_enum!(PendenzKategorie {
    Projekt => "projekt",
    Allgemein => "allgemein",
    Benutzer => "benutzer",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_day_blocks_both_halves() {
        assert!(HalfDay::FullDay.overlaps(HalfDay::Morning));
        assert!(HalfDay::Afternoon.overlaps(HalfDay::FullDay));
        assert!(!HalfDay::Morning.overlaps(HalfDay::Afternoon));
    }

    #[test]
    fn half_day_hours_follow_daily_hours() {
        assert_eq!(HalfDay::Morning.hours(8.5), 4.25);
        assert_eq!(HalfDay::FullDay.hours(8.5), 8.5);
    }

    #[test]
    fn parses_and_prints_stored_values() {
        assert_eq!("external_firm".parse::<EmployeeType>().unwrap(), EmployeeType::ExternalFirm);
        assert_eq!(StatusCode::Vacation.to_string(), "vacation");
        assert!("holiday".parse::<StatusCode>().is_err());
    }

    #[test]
    fn lists_choices_for_messages() {
        assert_eq!(HalfDay::choices(), "morning, afternoon, full_day");
    }

    #[test]
    fn office_is_a_department_but_not_a_phase() {
        assert!(!Department::Buero.is_phase());
        assert_eq!(Department::Montage.phase_rank(), 6);
        assert_eq!(Department::Beschlaege.label(), "Beschläge");
    }

    #[test]
    fn serializes_with_stored_spelling() {
        let json = serde_json::to_string(&TaskStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
    }
}
