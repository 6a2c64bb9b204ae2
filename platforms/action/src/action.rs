use keymap::KeyMap;

#[derive(KeyMap, Clone, Copy, Debug, PartialEq)]
pub enum Action {
    /// Quit the application
    #[key("q")]
    Quit,
    /// Open a program file as a new machine
    #[key("r")]
    Open,
    /// Select the previous machine
    #[key("w", "up")]
    Previous,
    /// Select the next machine
    #[key("s", "down")]
    Next,
    /// Start or pause the selected machine
    #[key("e", "space")]
    TogglePlay,
    /// Remove the selected machine
    #[key("x")]
    Delete,
    /// Add a copy of the selected machine
    #[key("c")]
    Duplicate,
    /// Toggle help display
    #[key("h")]
    ToggleHelp,
}
