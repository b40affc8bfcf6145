use std::collections::{BTreeMap, HashMap};

use rand::SeedableRng;
use rand::rngs::StdRng;
use twentyq_core::model::{AnswerStrength, Candidate, Catalog, Observation, QuestionId};
use twentyq_core::select::split_value;
use twentyq_core::{BeliefEngine, LikelihoodModel, Outcome, QuestionSelector, Session};

fn q(id: u32) -> QuestionId {
    QuestionId::new(id)
}

fn questions(count: u32) -> BTreeMap<QuestionId, String> {
    (1..=count)
        .map(|id| (q(id), format!("Question number {id}?")))
        .collect()
}

/// Deterministic pseudo-varied catalog: `people` candidates over `count` questions.
fn grid_catalog(people: usize, count: u32) -> Catalog {
    let candidates = (0..people)
        .map(|i| {
            (1..=count).fold(Candidate::new(format!("person-{i:02}")), |c, j| {
                let index = (i * 7 + j as usize * 3 + i * j as usize) % 5;
                c.with_answer(q(j), AnswerStrength::from_index(index).unwrap())
            })
        })
        .collect();
    Catalog::new(questions(count), candidates).unwrap()
}

#[test]
fn decisive_answer_between_two_disjoint_candidates() {
    let catalog = Catalog::new(
        questions(1),
        vec![
            Candidate::new("X").with_answer(q(1), AnswerStrength::Yes),
            Candidate::new("Y").with_answer(q(1), AnswerStrength::No),
        ],
    )
    .unwrap();

    let mut session = Session::with_rng(&catalog, StdRng::seed_from_u64(1));
    let first = session.start().unwrap();
    assert_eq!(
        first.outcome,
        Outcome::Ask {
            question: q(1),
            text: "Question number 1?".into()
        }
    );

    let turn = session.answer(q(1), 1.0).unwrap();
    let x = turn.posterior.probability_of("X").unwrap();
    let y = turn.posterior.probability_of("Y").unwrap();
    assert!(x > 2.5 * y, "x={x} y={y}");
    // The only question is spent, so the engine falls back to the best candidate.
    assert!(matches!(turn.outcome, Outcome::Winner { ref name, .. } if name == "X"));
    assert_eq!(turn.history, vec![Observation::new(q(1), 1.0)]);
}

/// The posterior formula does not normalise across candidates. With one decisive answer X
/// sits at 0.5 / 0.55 and Y at 1 / 3, so X stays under the 0.95 confidence threshold and the
/// two values add up to more than one.
#[test]
fn posterior_sum_exceeds_one_for_two_disjoint_candidates() {
    let catalog = Catalog::new(
        questions(1),
        vec![
            Candidate::new("X").with_answer(q(1), AnswerStrength::Yes),
            Candidate::new("Y").with_answer(q(1), AnswerStrength::No),
        ],
    )
    .unwrap();

    let mut session = Session::with_rng(&catalog, StdRng::seed_from_u64(1));
    session.start().unwrap();
    let turn = session.answer(q(1), 1.0).unwrap();

    let x = turn.posterior.probability_of("X").unwrap();
    let y = turn.posterior.probability_of("Y").unwrap();
    assert!((x - 0.5 / 0.55).abs() < 1e-12, "x={x}");
    assert!((y - 1.0 / 3.0).abs() < 1e-12, "y={y}");
    assert!(x < 0.95, "x={x} should not reach the confidence threshold");
    assert!((turn.posterior.total() - 1.242_424_242_424).abs() < 1e-9);
    assert!(turn.posterior.total() > 1.0);
    assert!(turn.posterior.iter().all(|e| (0.0..=1.0).contains(&e.probability)));
}

#[test]
fn first_turn_asks_the_best_splitting_question() {
    let catalog = Catalog::new(
        questions(3),
        vec![
            Candidate::new("a")
                .with_answer(q(1), AnswerStrength::Yes)
                .with_answer(q(2), AnswerStrength::Yes)
                .with_answer(q(3), AnswerStrength::Yes),
            Candidate::new("b")
                .with_answer(q(1), AnswerStrength::Yes)
                .with_answer(q(2), AnswerStrength::No)
                .with_answer(q(3), AnswerStrength::ProbablyNot),
            Candidate::new("c")
                .with_answer(q(1), AnswerStrength::No)
                .with_answer(q(2), AnswerStrength::Unknown)
                .with_answer(q(3), AnswerStrength::No),
        ],
    )
    .unwrap();

    for seed in 0..10 {
        let mut session = Session::with_rng(&catalog, StdRng::seed_from_u64(seed));
        let turn = session.start().unwrap();
        let Outcome::Ask { question, .. } = turn.outcome else {
            panic!("three candidates must not conclude on turn zero");
        };

        let members: Vec<&Candidate> = catalog.candidates().iter().collect();
        let best_split = catalog
            .question_ids()
            .map(|id| split_value(id, &members))
            .fold(0.0_f64, f64::max);
        assert_eq!(split_value(question, &members), best_split);
        assert_eq!(question, q(2));
    }
}

#[test]
fn indistinguishable_crowd_is_pruned_to_no_match() {
    // 21 identical candidates keep a uniform posterior of 1/21, below the 0.05 cut.
    let candidates = (0..21)
        .map(|i| {
            (1..=18).fold(Candidate::new(format!("twin-{i}")), |c, j| {
                c.with_answer(q(j), AnswerStrength::Yes)
            })
        })
        .collect();
    let catalog = Catalog::new(questions(18), candidates).unwrap();
    let mut session = Session::with_rng(&catalog, StdRng::seed_from_u64(4));

    let mut turn = session.start().unwrap();
    let mut answered = 0;
    while let Outcome::Ask { question, .. } = turn.outcome {
        answered += 1;
        turn = session.answer(question, 1.0).unwrap();
        if answered <= 15 {
            assert_eq!(session.active().len(), 21);
        }
    }

    assert_eq!(answered, 16);
    assert_eq!(turn.outcome, Outcome::NoMatch);
    assert!(session.active().is_empty());
    assert!(session.state().is_concluded());
}

#[test]
fn exact_ties_are_broken_randomly() {
    let catalog = Catalog::new(
        questions(3),
        vec![
            Candidate::new("a")
                .with_answer(q(1), AnswerStrength::Yes)
                .with_answer(q(2), AnswerStrength::Yes),
            Candidate::new("b")
                .with_answer(q(1), AnswerStrength::No)
                .with_answer(q(2), AnswerStrength::No),
            Candidate::new("c"),
        ],
    )
    .unwrap();
    let active: Vec<_> = catalog.candidate_ids().collect();

    let tied = QuestionSelector::best_questions(&catalog, &active, &[]).unwrap();
    assert_eq!(tied, vec![q(1), q(2)]);

    let mut rng = StdRng::seed_from_u64(2024);
    let mut counts: HashMap<QuestionId, usize> = HashMap::new();
    for _ in 0..400 {
        let chosen = QuestionSelector::select(&catalog, &active, &[], &mut rng)
            .unwrap()
            .unwrap();
        *counts.entry(chosen).or_default() += 1;
    }
    assert!(counts.get(&q(1)).copied().unwrap_or(0) > 0);
    assert!(counts.get(&q(2)).copied().unwrap_or(0) > 0);
    assert!(!counts.contains_key(&q(3)));
}

#[test]
fn active_set_never_grows_and_sessions_terminate() {
    let catalog = grid_catalog(25, 24);
    for seed in 0..6u64 {
        let mut session = Session::with_rng(&catalog, StdRng::seed_from_u64(seed));
        let mut turn = session.start().unwrap();
        let mut sizes = vec![session.active().len()];
        let mut step = 0usize;

        while let Outcome::Ask { question, .. } = turn.outcome {
            let answer = [0.5, 0.25, 0.75, 1.0, 0.0][(step + seed as usize) % 5];
            step += 1;
            turn = session.answer(question, answer).unwrap();
            sizes.push(session.active().len());

            if let Outcome::Ask { .. } = turn.outcome {
                let confident = turn
                    .posterior
                    .iter()
                    .filter(|entry| session.active().contains(&entry.id))
                    .any(|entry| entry.probability > 0.95);
                assert!(!confident, "a confident posterior must end the session");
            }
        }

        assert!(session.history().len() <= 20);
        assert!(sizes.windows(2).all(|pair| pair[1] <= pair[0]), "{sizes:?}");
        for entry in turn.posterior.iter() {
            assert!((0.0..=1.0).contains(&entry.probability));
        }
    }
}

#[test]
fn twenty_answers_always_conclude() {
    let catalog = grid_catalog(30, 26);
    let mut session = Session::with_rng(&catalog, StdRng::seed_from_u64(77));
    let mut turn = session.start().unwrap();
    while let Outcome::Ask { question, .. } = turn.outcome {
        turn = session.answer(question, 0.5).unwrap();
    }
    assert!(session.history().len() <= 20);
    assert!(turn.outcome.is_final());
}

#[test]
fn likelihoods_stay_in_unit_interval_for_every_candidate() {
    let catalog = grid_catalog(12, 10);
    let members: Vec<&Candidate> = catalog.candidates().iter().collect();
    let history: Vec<Observation> = (1..=10)
        .map(|j| Observation::new(q(j), (j as f64 * 0.37) % 1.0))
        .collect();
    let model = LikelihoodModel::default();
    for candidate in &members {
        let lk = model.evaluate(candidate, &history, &members);
        for value in [lk.given_candidate, lk.given_other] {
            assert!(value.is_finite() && value > 0.0 && value <= 1.0, "{value}");
        }
    }
}

#[test]
fn posteriors_are_reproducible() {
    let catalog = grid_catalog(10, 8);
    let active: Vec<_> = catalog.candidate_ids().collect();
    let history = vec![
        Observation::new(q(3), 1.0),
        Observation::new(q(5), 0.25),
        Observation::new(q(1), 0.6),
    ];
    let engine = BeliefEngine::default();
    let first = engine.posteriors(&catalog, &history, &active).unwrap();
    let second = engine.posteriors(&catalog, &history, &active).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 10);
}

#[test]
fn bundled_catalog_finds_every_character_from_exact_answers() {
    let catalog = Catalog::from_json(include_str!("../../../data/catalog.json")).unwrap();
    assert_eq!(catalog.len(), 14);
    for target in catalog.candidates() {
        for seed in 0..3 {
            let mut session = Session::with_rng(&catalog, StdRng::seed_from_u64(seed));
            let mut turn = session.start().unwrap();
            while let Outcome::Ask { question, .. } = turn.outcome {
                let answer = target.strength(question).value();
                turn = session.answer(question, answer).unwrap();
            }
            match turn.outcome {
                Outcome::Winner { name, .. } => assert_eq!(name, target.name()),
                other => panic!("expected {} but got {other:?}", target.name()),
            }
        }
    }
}
