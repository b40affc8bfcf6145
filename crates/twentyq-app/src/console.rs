//! Line-oriented question and answer loop.

use std::io::{BufRead, Write};

use anyhow::Result;
use rand::Rng;
use tracing::debug;
use twentyq_core::belief::PosteriorEntry;
use twentyq_core::{AnswerPreset, Outcome, Session, TurnOutput};

const POSTERIOR_ROWS: usize = 5;

/// How a console game ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Ending {
    Concluded(Outcome),
    Quit,
    InputClosed,
}

pub struct Console<I, O> {
    input: I,
    output: O,
    show_posterior: bool,
}

impl<I: BufRead, O: Write> Console<I, O> {
    pub fn new(input: I, output: O) -> Self {
        Self {
            input,
            output,
            show_posterior: false,
        }
    }

    pub fn show_posterior(mut self, enabled: bool) -> Self {
        self.show_posterior = enabled;
        self
    }

    /// Plays `session` until it concludes, the player quits, or input runs dry.
    ///
    /// Unparseable or out-of-range answers are reported and the same question is asked again.
    pub fn run<R: Rng>(&mut self, session: &mut Session<'_, R>) -> Result<Ending> {
        writeln!(
            self.output,
            "Think of one of {} characters. Answer with y, p, ?, pn, n or a number from 0 to 1.",
            session.catalog().len()
        )?;

        let mut turn = session.start()?;
        loop {
            if self.show_posterior {
                self.print_posterior(&turn)?;
            }

            let question = match &turn.outcome {
                Outcome::Ask { question, text } => {
                    writeln!(self.output, "{question}. {text}")?;
                    *question
                }
                outcome => {
                    self.announce(outcome)?;
                    return Ok(Ending::Concluded(outcome.clone()));
                }
            };

            turn = loop {
                write!(self.output, "> ")?;
                self.output.flush()?;

                let mut line = String::new();
                if self.input.read_line(&mut line)? == 0 {
                    writeln!(self.output)?;
                    writeln!(self.output, "Input closed, leaving the game.")?;
                    return Ok(Ending::InputClosed);
                }
                let line = line.trim();

                match line.to_ascii_lowercase().as_str() {
                    "" => continue,
                    "quit" | "exit" => {
                        writeln!(self.output, "Goodbye.")?;
                        return Ok(Ending::Quit);
                    }
                    "help" => {
                        self.print_help()?;
                        continue;
                    }
                    "status" => {
                        self.print_posterior(&turn)?;
                        continue;
                    }
                    _ => {}
                }

                let Some(value) = AnswerPreset::parse_value(line) else {
                    debug!(target: "twentyq::app", input = line, "unrecognised answer");
                    writeln!(
                        self.output,
                        "Unrecognised answer '{line}'. Type 'help' for the options."
                    )?;
                    continue;
                };

                match session.answer(question, value) {
                    Ok(next) => break next,
                    Err(err) if err.is_recoverable() => {
                        writeln!(self.output, "{err}")?;
                    }
                    Err(err) => return Err(err.into()),
                }
            };
        }
    }

    pub fn into_output(self) -> O {
        self.output
    }

    fn announce(&mut self, outcome: &Outcome) -> Result<()> {
        match outcome {
            Outcome::Winner { name, probability } => writeln!(
                self.output,
                "I think you are thinking of {name} (posterior {probability:.3})."
            )?,
            Outcome::NoMatch => {
                writeln!(self.output, "No character in the catalog fits those answers.")?
            }
            Outcome::Ask { .. } => {}
        }
        Ok(())
    }

    fn print_posterior(&mut self, turn: &TurnOutput) -> Result<()> {
        let mut ranked: Vec<&PosteriorEntry> = turn.posterior.iter().collect();
        ranked.sort_by(|a, b| b.probability.total_cmp(&a.probability));
        writeln!(self.output, "  after {} answers:", turn.history.len())?;
        for entry in ranked.iter().take(POSTERIOR_ROWS) {
            writeln!(self.output, "  {:>7.4}  {}", entry.probability, entry.name)?;
        }
        Ok(())
    }

    fn print_help(&mut self) -> Result<()> {
        for preset in AnswerPreset::ALL {
            writeln!(self.output, "  {:<13} {}", preset.label(), preset.value())?;
        }
        writeln!(self.output, "  any number between 0 and 1 is accepted as well")?;
        writeln!(self.output, "  status  show the leading candidates")?;
        writeln!(self.output, "  quit    leave the game")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::BTreeMap;
    use std::io::Cursor;
    use twentyq_core::{AnswerStrength, Candidate, Catalog, QuestionId};

    fn catalog() -> Catalog {
        let mut questions = BTreeMap::new();
        questions.insert(QuestionId::new(1), "Does it purr?".to_string());
        Catalog::new(
            questions,
            vec![
                Candidate::new("cat").with_answer(QuestionId::new(1), AnswerStrength::Yes),
                Candidate::new("dog").with_answer(QuestionId::new(1), AnswerStrength::No),
            ],
        )
        .unwrap()
    }

    fn play(script: &str, show_posterior: bool) -> (Ending, String) {
        let catalog = catalog();
        let mut session = Session::with_rng(&catalog, StdRng::seed_from_u64(3));
        let mut console = Console::new(Cursor::new(script.as_bytes().to_vec()), Vec::new())
            .show_posterior(show_posterior);
        let ending = console.run(&mut session).unwrap();
        let output = String::from_utf8(console.into_output()).unwrap();
        (ending, output)
    }

    #[test]
    fn preset_answer_concludes_with_winner() {
        let (ending, output) = play("y\n", false);
        assert!(matches!(ending, Ending::Concluded(Outcome::Winner { ref name, .. }) if name == "cat"));
        assert!(output.contains("Q1. Does it purr?"));
        assert!(output.contains("I think you are thinking of cat"));
    }

    #[test]
    fn bad_answers_are_reported_and_the_question_repeats() {
        let (ending, output) = play("maybe\n1.5\n\n0\n", false);
        assert!(output.contains("Unrecognised answer 'maybe'"));
        assert!(output.contains("outside [0, 1]"));
        assert!(matches!(ending, Ending::Concluded(Outcome::Winner { ref name, .. }) if name == "dog"));
    }

    #[test]
    fn quit_and_eof_end_without_a_verdict() {
        assert_eq!(play("quit\n", false).0, Ending::Quit);
        let (ending, output) = play("", false);
        assert_eq!(ending, Ending::InputClosed);
        assert!(output.contains("Input closed"));
    }

    #[test]
    fn status_and_posterior_listing_show_candidates() {
        let (_, output) = play("status\ny\n", true);
        assert!(output.contains("after 0 answers"));
        assert!(output.contains("after 1 answers"));
        assert!(output.contains("  0.5000  cat"));
    }
}
