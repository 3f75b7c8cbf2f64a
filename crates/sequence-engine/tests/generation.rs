mod common;

use common::*;

use seqgen_engine::model::{
    Angle, AtomKind, CalibrationRole, ExecutionHistory, ObservationInput, ObservingMode, ObserveClass, Offset,
    QaState, SequenceType, StepConfig, StepStage, TimeSpan,
};
use seqgen_engine::{
    EngineConfig, ExposureTimeCalculator, GeneratorState, ItcError, ItcRequest, ItcResult, SequenceEngine,
    SequenceError,
};

fn engine() -> SequenceEngine {
    SequenceEngine::new(EngineConfig::default())
}

fn arcsec(values: &[i64]) -> Vec<Angle> {
    values.iter().map(|v| Angle::from_arcseconds(*v)).collect()
}

fn next_science_id(input: &ObservationInput) -> seqgen_engine::model::AtomId {
    engine()
        .generate_static(input, Some(0))
        .unwrap()
        .science
        .next_atom
        .unwrap()
        .id
}

#[test]
fn test_generation_is_idempotent() {
    let input = observation("o-1", ObservingMode::GmosNorthLongSlit(gmos_long_slit()), 1200, 10);
    let first = engine().generate_static(&input, None).unwrap();
    let second = engine().generate_static(&input, None).unwrap();
    assert_eq!(first, second);
    assert_eq!(first.science.state, GeneratorState::Unconsumed);
}

#[test]
fn test_next_atom_is_stable_while_in_progress() {
    let mut input = observation("o-2", ObservingMode::GmosNorthLongSlit(gmos_long_slit()), 1200, 10);
    let plan = engine().generate_static(&input, Some(1)).unwrap().science;
    let first = plan.next_atom.unwrap();
    let second = plan.possible_future[0].clone();
    assert_eq!(first.kind, AtomKind::Calibration);

    input.history = ExecutionHistory {
        atoms: vec![record_atom(&first, "v-1", SequenceType::Science, vec![])],
    };
    let mut second_counter = 0;
    for (index, step) in first.steps.iter().enumerate() {
        let base = (index as u32) * 100;
        let events = [
            (StepStage::StartStep, base),
            (StepStage::EndConfigure, base + 5),
            (StepStage::StartObserve, base + 10),
            (StepStage::EndObserve, base + 20),
            (StepStage::EndStep, base + 30),
        ];
        input.history.atoms[0].steps.push(record_step(step, &[], None));
        for n in 1..=events.len() {
            input.history.atoms[0].steps[index] = record_step(step, &events[..n], Some(QaState::Pass));
            let last_of_atom = index + 1 == first.steps.len() && n == events.len();
            let id = next_science_id(&input);
            if last_of_atom {
                assert_eq!(id, second.id);
                second_counter += 1;
            } else {
                assert_eq!(id, first.id, "step {} after {} events", index, n);
            }
        }
    }
    assert_eq!(second_counter, 1);
}

#[test]
fn test_resuming_state_reported() {
    let mut input = observation("o-3", ObservingMode::GmosNorthLongSlit(gmos_long_slit()), 1200, 10);
    let first = engine().generate_static(&input, Some(0)).unwrap().science.next_atom.unwrap();
    input.history.atoms.push(record_atom(
        &first,
        "v-1",
        SequenceType::Science,
        vec![completed(&first.steps[0], None)],
    ));
    let science = engine().generate_static(&input, Some(0)).unwrap().science;
    assert_eq!(science.state, GeneratorState::Resuming);
    let next = science.next_atom.unwrap();
    assert_eq!(next.id, first.id);
    assert_eq!(next.steps.len(), 1);
    assert_eq!(next.steps[0].id, first.steps[1].id);
}

#[test]
fn test_offset_cycle_reduction() {
    let mut redundant = gmos_long_slit();
    redundant.explicit_spatial_offsets = Some(arcsec(&[10, -10, -10, 10]));
    let mut reduced = gmos_long_slit();
    reduced.explicit_spatial_offsets = Some(arcsec(&[10, -10]));

    let a = engine()
        .generate_static(&observation("o-4", ObservingMode::GmosNorthLongSlit(redundant), 1200, 12), None)
        .unwrap();
    let b = engine()
        .generate_static(&observation("o-4", ObservingMode::GmosNorthLongSlit(reduced), 1200, 12), None)
        .unwrap();
    assert_eq!(a, b);

    let science: Vec<_> = a
        .science
        .next_atom
        .iter()
        .chain(a.science.possible_future.iter())
        .filter(|atom| atom.kind == AtomKind::Science)
        .collect();
    let described: Vec<(String, Vec<Angle>)> = science
        .iter()
        .map(|atom| {
            let q = atom
                .steps
                .iter()
                .filter_map(|s| s.step_config.offset().map(|o| o.q))
                .collect();
            (atom.description.clone().unwrap_or_default(), q)
        })
        .collect();
    assert_eq!(
        described,
        vec![
            ("0.000 nm, 10.000000″".to_string(), arcsec(&[10, 10, -10])),
            ("5.000 nm, -10.000000″".to_string(), arcsec(&[-10, -10, 10])),
            ("-5.000 nm, 10.000000″".to_string(), arcsec(&[10, 10, -10])),
            ("0.000 nm, -10.000000″".to_string(), arcsec(&[-10, -10, 10])),
        ]
    );
    assert!(!a.science.has_more);
}

#[test]
fn test_sequence_atom_limit() {
    let config = EngineConfig {
        sequence_atom_limit: 10,
        ..EngineConfig::default()
    };
    let engine = SequenceEngine::new(config);

    // one exposure per atom plus a single arc and flat atom
    let over = observation("o-5", ObservingMode::GmosNorthLongSlit(single_adjustment(1)), 60, 11);
    let err = engine.generate_static(&over, None).unwrap_err();
    assert_eq!(
        err,
        SequenceError::SequenceTooLong {
            observation_id: over.observation_id.clone(),
            limit: 10
        }
    );
    assert!(engine.digest_static(&over).is_err());

    let under = observation("o-5", ObservingMode::GmosNorthLongSlit(single_adjustment(1)), 60, 9);
    assert!(engine.generate_static(&under, None).is_ok());
    let digest = engine.digest_static(&under).unwrap();
    assert_eq!(digest.execution.science.observe_class, Some(ObserveClass::Science));
    assert_eq!(digest.execution.science.atom_count, 10);
}

#[test]
fn test_sequence_atom_limit_counts_exposures() {
    let engine = engine();
    let limit = engine.config().sequence_atom_limit as u32;

    let over = observation("o-16", ObservingMode::GmosNorthLongSlit(gmos_long_slit()), 60, limit + 1);
    assert_eq!(
        engine.generate_static(&over, Some(0)).unwrap_err(),
        SequenceError::SequenceTooLong {
            observation_id: over.observation_id.clone(),
            limit: limit as usize
        }
    );

    let under = observation("o-16", ObservingMode::GmosNorthLongSlit(gmos_long_slit()), 60, limit - 1);
    assert!(engine.generate_static(&under, Some(0)).is_ok());
    let digest = engine.digest_static(&under).unwrap();
    assert_eq!(digest.execution.science.observe_class, Some(ObserveClass::Science));
}

#[test]
fn test_failed_step_redone_within_open_atom() {
    let mut input = observation("o-6", ObservingMode::GmosNorthLongSlit(single_adjustment(3)), 1200, 6);
    let plan = engine().generate_static(&input, Some(5)).unwrap().science;
    let calibration = plan.next_atom.unwrap();
    let science = plan.possible_future[0].clone();
    assert_eq!(science.steps.len(), 3);

    input.history.atoms = vec![
        record_atom(
            &calibration,
            "v-1",
            SequenceType::Science,
            calibration.steps.iter().map(|s| completed(s, Some(QaState::Pass))).collect(),
        ),
        record_atom(
            &science,
            "v-1",
            SequenceType::Science,
            vec![
                completed(&science.steps[0], Some(QaState::Fail)),
                completed(&science.steps[1], Some(QaState::Usable)),
            ],
        ),
    ];

    let next = engine().generate_static(&input, Some(5)).unwrap().science;
    assert_eq!(next.state, GeneratorState::Resuming);
    let atom = next.next_atom.unwrap();
    assert_eq!(atom.id, science.id);
    assert_eq!(atom.steps.len(), 2);
    assert_eq!(atom.steps[0].id, science.steps[2].id);
    let redo = &atom.steps[1];
    assert!(science.steps.iter().all(|s| s.id != redo.id));
    assert_eq!(redo.instrument_config, science.steps[0].instrument_config);
    assert_eq!(redo.step_config, science.steps[0].step_config);
}

#[test]
fn test_failed_step_of_closed_atom_goes_to_the_end() {
    let mut input = observation("o-7", ObservingMode::GmosNorthLongSlit(single_adjustment(3)), 1200, 6);
    let plan = engine().generate_static(&input, Some(5)).unwrap().science;
    let calibration = plan.next_atom.unwrap();
    let science = plan.possible_future[0].clone();
    let last = plan.possible_future[1].clone();

    input.history.atoms = vec![
        record_atom(
            &calibration,
            "v-1",
            SequenceType::Science,
            calibration.steps.iter().map(|s| completed(s, None)).collect(),
        ),
        record_atom(
            &science,
            "v-1",
            SequenceType::Science,
            vec![
                completed(&science.steps[0], Some(QaState::Pass)),
                completed(&science.steps[1], Some(QaState::Fail)),
                completed(&science.steps[2], Some(QaState::Pass)),
            ],
        ),
    ];

    let next = engine().generate_static(&input, Some(5)).unwrap().science;
    assert_eq!(next.state, GeneratorState::Producing);
    assert_eq!(next.next_atom.map(|a| a.id), Some(last.id));
    assert_eq!(next.possible_future.len(), 1);
    let redo = &next.possible_future[0];
    assert_eq!(redo.description.as_deref(), Some("Repeat failed step"));
    assert_eq!(redo.steps.len(), 1);
    assert_eq!(redo.steps[0].instrument_config, science.steps[1].instrument_config);
    assert!(!next.has_more);
}

/// Three distinct offsets so every step of a science atom is distinguishable.
fn three_offsets(id: &str, exposures: u32) -> ObservationInput {
    let mut cfg = single_adjustment(3);
    cfg.explicit_spatial_offsets = Some(arcsec(&[0, 5, 10]));
    observation(id, ObservingMode::GmosNorthLongSlit(cfg), 1200, exposures)
}

#[test]
fn test_multiple_failures_in_open_atom_redone_in_recording_order() {
    let mut input = three_offsets("o-17", 6);
    let plan = engine().generate_static(&input, Some(5)).unwrap().science;
    let calibration = plan.next_atom.unwrap();
    let science = plan.possible_future[0].clone();

    input.history.atoms = vec![
        record_atom(
            &calibration,
            "v-1",
            SequenceType::Science,
            calibration.steps.iter().map(|s| completed(s, None)).collect(),
        ),
        record_atom(
            &science,
            "v-1",
            SequenceType::Science,
            vec![
                completed(&science.steps[1], Some(QaState::Fail)),
                completed(&science.steps[0], Some(QaState::Fail)),
            ],
        ),
    ];

    let atom = engine().generate_static(&input, Some(0)).unwrap().science.next_atom.unwrap();
    assert_eq!(atom.id, science.id);
    let configs: Vec<_> = atom.steps.iter().map(|s| s.step_config).collect();
    assert_eq!(
        configs,
        vec![
            science.steps[2].step_config,
            science.steps[1].step_config,
            science.steps[0].step_config,
        ]
    );
}

#[test]
fn test_multiple_failures_in_closed_atom_redone_in_recording_order() {
    let mut input = three_offsets("o-18", 6);
    let plan = engine().generate_static(&input, Some(5)).unwrap().science;
    let calibration = plan.next_atom.unwrap();
    let science = plan.possible_future[0].clone();

    input.history.atoms = vec![
        record_atom(
            &calibration,
            "v-1",
            SequenceType::Science,
            calibration.steps.iter().map(|s| completed(s, None)).collect(),
        ),
        record_atom(
            &science,
            "v-1",
            SequenceType::Science,
            vec![
                completed(&science.steps[2], Some(QaState::Fail)),
                completed(&science.steps[1], Some(QaState::Pass)),
                completed(&science.steps[0], Some(QaState::Fail)),
            ],
        ),
    ];

    let next = engine().generate_static(&input, Some(5)).unwrap().science;
    let redo: Vec<_> = next
        .possible_future
        .iter()
        .filter(|atom| atom.description.as_deref() == Some("Repeat failed step"))
        .map(|atom| atom.steps[0].step_config)
        .collect();
    assert_eq!(redo, vec![science.steps[2].step_config, science.steps[0].step_config]);
    let last = next.possible_future.len() - 2;
    assert_eq!(next.possible_future[last].description.as_deref(), Some("Repeat failed step"));
    assert!(!next.has_more);
}

#[test]
fn test_calibration_roles_have_no_acquisition() {
    for role in [CalibrationRole::Twilight, CalibrationRole::SpectroPhotometric] {
        let mut gmos = observation("o-8", ObservingMode::GmosSouthLongSlit(gmos_long_slit()), 30, 3);
        gmos.calibration_role = Some(role);
        let generated = engine().generate_static(&gmos, None).unwrap();
        assert!(generated.acquisition.is_none());
        assert!(generated
            .science
            .next_atom
            .iter()
            .all(|atom| atom.kind == AtomKind::Science));
        assert!(engine().digest_static(&gmos).unwrap().execution.acquisition.is_none());

        let mut f2 = observation("o-9", ObservingMode::Flamingos2LongSlit(flamingos2_long_slit()), 30, 4);
        f2.calibration_role = Some(role);
        assert!(engine().generate_static(&f2, None).unwrap().acquisition.is_none());
    }
}

#[test]
fn test_acquisition_restarts_with_each_visit() {
    let mut input = observation("o-10", ObservingMode::GmosNorthLongSlit(gmos_long_slit()), 1200, 3);
    let acquisition = engine().generate_static(&input, Some(2)).unwrap().acquisition.unwrap();
    assert!(acquisition.has_more);
    let initial = acquisition.next_atom.unwrap();
    assert_eq!(initial.description.as_deref(), Some("Initial Acquisition"));
    assert_eq!(initial.steps.len(), 3);

    input.history.atoms = vec![record_atom(
        &initial,
        "v-1",
        SequenceType::Acquisition,
        initial.steps.iter().map(|s| completed(s, None)).collect(),
    )];
    let next = engine().generate_static(&input, Some(0)).unwrap().acquisition.unwrap();
    assert_eq!(next.state, GeneratorState::Producing);
    assert_eq!(next.next_atom.unwrap().description.as_deref(), Some("Fine Adjustments"));

    let science = engine().generate_static(&input, Some(0)).unwrap().science.next_atom.unwrap();
    input
        .history
        .atoms
        .push(record_atom(&science, "v-2", SequenceType::Science, vec![]));
    let restarted = engine().generate_static(&input, Some(0)).unwrap().acquisition.unwrap();
    assert_eq!(restarted.state, GeneratorState::Unconsumed);
    assert_eq!(restarted.next_atom.map(|a| a.id), Some(initial.id));
}

#[test]
fn test_new_visit_acquisition_priced_from_its_own_visit() {
    let mut input = observation("o-23", ObservingMode::GmosNorthLongSlit(gmos_long_slit()), 1200, 6);
    let fresh = engine().generate_static(&input, Some(1)).unwrap();
    let initial = fresh.acquisition.unwrap().next_atom.unwrap();
    let calibration = fresh.science.next_atom.unwrap();
    let science = fresh.science.possible_future[0].clone();

    input.history.atoms = vec![
        record_atom(
            &initial,
            "v-1",
            SequenceType::Acquisition,
            initial.steps.iter().map(|s| completed(s, None)).collect(),
        ),
        record_atom(
            &calibration,
            "v-1",
            SequenceType::Science,
            calibration.steps.iter().map(|s| completed(s, None)).collect(),
        ),
        record_atom(&science, "v-2", SequenceType::Science, vec![]),
    ];

    let restarted = engine().generate_static(&input, Some(0)).unwrap().acquisition.unwrap();
    assert_eq!(restarted.next_atom, Some(initial));
}

#[test]
fn test_flamingos2_cycle_ceiling() {
    let long = observation("o-11", ObservingMode::Flamingos2LongSlit(flamingos2_long_slit()), 1200, 4);
    let err = engine().generate_static(&long, None).unwrap_err();
    assert_eq!(err.kind(), "cycle_too_long");
    assert!(err
        .to_string()
        .ends_with("longer than the 60 minute maximum"));

    let short = observation("o-11", ObservingMode::Flamingos2LongSlit(flamingos2_long_slit()), 60, 6);
    let generated = engine().generate_static(&short, None).unwrap();
    assert!(generated.acquisition.is_some());
    let atoms: Vec<_> = generated
        .science
        .next_atom
        .iter()
        .chain(generated.science.possible_future.iter())
        .filter(|atom| atom.kind == AtomKind::Science)
        .collect();
    assert_eq!(atoms.len(), 2);
    let offsets: Vec<Offset> = atoms[0].steps.iter().filter_map(|s| s.step_config.offset()).collect();
    assert_eq!(
        offsets,
        arcsec(&[15, -15, -15, 15])
            .into_iter()
            .map(Offset::along_slit)
            .collect::<Vec<_>>()
    );
}

#[test]
fn test_flamingos2_single_arc_and_flat_ahead_of_nod_cycles() {
    let input = observation("o-19", ObservingMode::Flamingos2LongSlit(flamingos2_long_slit()), 60, 10);
    let science = engine().generate_static(&input, None).unwrap().science;
    let atoms: Vec<_> = science.next_atom.iter().chain(science.possible_future.iter()).collect();
    let kinds: Vec<AtomKind> = atoms.iter().map(|atom| atom.kind).collect();
    assert_eq!(
        kinds,
        vec![AtomKind::Calibration, AtomKind::Science, AtomKind::Science, AtomKind::Science]
    );
    assert!(atoms[0]
        .steps
        .iter()
        .all(|s| matches!(s.step_config, StepConfig::Gcal(_)) && s.observe_class == ObserveClass::PartnerCal));
    assert_eq!(atoms[0].steps[0].instrument_config.exposure(), TimeSpan::from_seconds(30));
}

#[test]
fn test_missing_parameters_are_all_reported() {
    let input = ObservationInput::new("o-12");
    let err = engine().generate_static(&input, None).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Could not generate a sequence for o-12: observation is missing target, observing mode"
    );

    let mut input = observation("o-13", ObservingMode::GmosNorthLongSlit(gmos_long_slit()), 1200, 3);
    if let Some(target) = &mut input.target {
        target.brightness = None;
        target.radial_velocity = None;
    }
    let err = engine().generate_static(&input, None).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Could not generate a sequence for o-13: observation is missing brightness, radial velocity"
    );
}

struct FailingItc;

impl ExposureTimeCalculator for FailingItc {
    fn calculate(&self, _request: &ItcRequest<'_>) -> Result<ItcResult, ItcError> {
        Err(ItcError::Service("ITC service unavailable".to_string()))
    }
}

#[test]
fn test_external_service_error_preserves_message() {
    let input = observation("o-14", ObservingMode::GmosNorthLongSlit(gmos_long_slit()), 1200, 3);
    let err = engine().generate(&input, &FailingItc, None).unwrap_err();
    assert_eq!(err.kind(), "external_service_error");
    assert_eq!(
        err.to_string(),
        "Could not generate a sequence for o-14: ITC service unavailable"
    );
}

#[test]
fn test_gcal_steps_follow_science_configuration() {
    let input = observation("o-15", ObservingMode::GmosNorthLongSlit(gmos_long_slit()), 1200, 3);
    let calibration = engine().generate_static(&input, Some(0)).unwrap().science.next_atom.unwrap();
    assert_eq!(calibration.description.as_deref(), Some("Arc and flat"));
    assert!(calibration
        .steps
        .iter()
        .all(|s| matches!(s.step_config, StepConfig::Gcal(_)) && s.observe_class == ObserveClass::PartnerCal));
}
