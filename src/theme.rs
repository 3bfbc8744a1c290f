use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Theme {
    pub font_family: String,
    pub font_size: f32,
    pub step_fill: String,
    pub step_border: String,
    pub text_color: String,
    pub line_color: String,
    pub failure_line_color: String,
    pub condition_fill: String,
    pub terminal_fill: String,
    pub missing_fill: String,
    pub retry_fill: String,
    pub portal_fill: String,
    pub portal_border: String,
    pub edge_label_background: String,
    pub background: String,
}

impl Theme {
    pub fn classic() -> Self {
        Self {
            font_family: "\"trebuchet ms\", verdana, arial, sans-serif".to_string(),
            font_size: 14.0,
            step_fill: "#ECECFF".to_string(),
            step_border: "#9370DB".to_string(),
            text_color: "#333333".to_string(),
            line_color: "#333333".to_string(),
            failure_line_color: "#C0392B".to_string(),
            condition_fill: "#FFFFDE".to_string(),
            terminal_fill: "#E8E8E8".to_string(),
            missing_fill: "#FDECEA".to_string(),
            retry_fill: "#FFF4E0".to_string(),
            portal_fill: "#FFFFFF".to_string(),
            portal_border: "#AAAA33".to_string(),
            edge_label_background: "#E8E8E8".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    pub fn modern() -> Self {
        Self {
            font_family: "Inter, Segoe UI, system-ui, -apple-system, sans-serif".to_string(),
            font_size: 13.0,
            step_fill: "#F8FAFF".to_string(),
            step_border: "#C7D2E5".to_string(),
            text_color: "#1C2430".to_string(),
            line_color: "#7A8AA6".to_string(),
            failure_line_color: "#D9534F".to_string(),
            condition_fill: "#EEF2F8".to_string(),
            terminal_fill: "#E6ECF5".to_string(),
            missing_fill: "#FFF1F0".to_string(),
            retry_fill: "#FFF7E6".to_string(),
            portal_fill: "#FFFFFF".to_string(),
            portal_border: "#8FA3C7".to_string(),
            edge_label_background: "#FFFFFF".to_string(),
            background: "#FFFFFF".to_string(),
        }
    }

    /// Built-in theme by name. `default`, `base` and `classic` all name the
    /// classic palette.
    pub fn named(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "modern" => Some(Self::modern()),
            "classic" | "default" | "base" => Some(Self::classic()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Theme;

    #[test]
    fn classic_aliases_resolve_to_one_palette() {
        let classic = Theme::classic();
        for name in ["classic", "default", "base", " Classic "] {
            let theme = Theme::named(name).expect("alias should resolve");
            assert_eq!(theme.step_fill, classic.step_fill, "{name}");
        }
        assert_eq!(Theme::named("modern").map(|t| t.font_size), Some(13.0));
        assert!(Theme::named("neon").is_none());
    }
}
