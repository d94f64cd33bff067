use colored::Colorize;

pub const EXIT_COMMANDS: [&str; 4] = ["exit", "quit", "q", "f"];

const RULE: &str = "---------------------------------------------------------------------------------";

pub fn is_exit_command(input: &str) -> bool {
    EXIT_COMMANDS.contains(&input)
}

pub fn print_banner() {
    println!("{}", RULE.yellow());
    println!(
        "{}",
        "Welcome to the DocBot. You are now ready to start interacting with your documents".yellow()
    );
    println!("{}", RULE.yellow());
}

pub fn prompt() -> String {
    format!("{} ", "Prompt:".green())
}

pub fn print_answer(answer: &str) {
    println!("{} {}", "Answer:".white(), answer.white());
}

pub fn print_goodbye() {
    println!("Exiting");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_commands() {
        for token in ["exit", "quit", "q", "f"] {
            assert!(is_exit_command(token), "{} should exit", token);
        }
        for token in ["", "Exit", "QUIT", "exit please", "fq"] {
            assert!(!is_exit_command(token), "{:?} should not exit", token);
        }
    }
}
