/// Plant-state taxonomy derived from a trace label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateProfile {
    Stress,
    Light,
    Calm,
    Normal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileDetails {
    pub predicted_state: &'static str,
    pub signal_state: &'static str,
    pub health_status: &'static str,
    pub emotion: &'static str,
    pub alert_message: &'static str,
}

/// Keywords checked in order; the first one found in the label wins.
const KEYWORDS: [(&str, StateProfile); 3] = [
    ("stress", StateProfile::Stress),
    ("light", StateProfile::Light),
    ("calm", StateProfile::Calm),
];

impl StateProfile {
    #[must_use]
    pub fn from_label(label: &str) -> Self {
        let label = label.to_lowercase();
        KEYWORDS
            .iter()
            .find(|(keyword, _)| label.contains(keyword))
            .map_or(Self::Normal, |(_, profile)| *profile)
    }

    #[must_use]
    pub fn details(self) -> ProfileDetails {
        match self {
            Self::Stress => ProfileDetails {
                predicted_state: "Stress Detected",
                signal_state: "Weak",
                health_status: "Under Stress",
                emotion: "Tense",
                alert_message: "पौधे में तनाव का संकेत 🌿 — निगरानी आवश्यक है।",
            },
            Self::Light => ProfileDetails {
                predicted_state: "Light Response",
                signal_state: "Reactive",
                health_status: "Active",
                emotion: "Energized",
                alert_message: "पौधा प्रकाश पर प्रतिक्रिया कर रहा है ☀️",
            },
            Self::Calm => ProfileDetails {
                predicted_state: "Calm",
                signal_state: "Balanced",
                health_status: "Healthy",
                emotion: "Peaceful",
                alert_message: "पौधा शांत और स्वस्थ है 🌱",
            },
            Self::Normal => ProfileDetails {
                predicted_state: "Normal",
                signal_state: "Stable",
                health_status: "Healthy",
                emotion: "Calm",
                alert_message: "स्थिति सामान्य है 🌱 आपका पौधा स्वस्थ है।",
            },
        }
    }
}
