use std::fs::OpenOptions;
use std::path::Path;

use float_eq::assert_float_eq;
use ndarray::ArrayD;
use pretty_assertions::assert_eq;
use rstest::rstest;

use photondb::{COLLISION_DATABASE, EXIT_DATABASE};
use photonmc::config::{DatabaseType, TissueInput};
use photonmc::detector::{Bins, DetectorInput, DetectorOutput, TallyType};
use photonmc::optics::OpticalProperties;
use photonmc::tissue::AbsorptionWeighting;
use photonmc::{Error, PostProcessor, PostProcessorInput, Simulation, SimulationInput, SimulationOutput};

fn baseline() -> OpticalProperties { OpticalProperties::new(0.01, 1.0, 0.8, 1.4) }
fn air() -> OpticalProperties { OpticalProperties::new(0.0, 1e-10, 1.0, 1.0) }

fn rho() -> Bins { Bins::uniform(0.0, 5.0, 11) }

fn recorded(weighting: AbsorptionWeighting) -> SimulationInput {
    let mut input = SimulationInput::one_layer_example();
    input.n = 300;
    input.tissue = TissueInput::slab(&[0.0, 5.0], &[baseline()]);
    input.options.absorption_weighting = weighting;
    input.options.databases = vec![DatabaseType::PhotonExit, DatabaseType::CollisionInfo];
    input.detectors = vec![
        DetectorInput::new(TallyType::ROfRho { rho: rho() }),
        DetectorInput::new(TallyType::ROfRhoAndTime { rho: rho(), time: Bins::uniform(0.0, 0.5, 6) }),
    ];
    input
}

fn simulate(input: &SimulationInput, dir: &Path) -> SimulationOutput {
    Simulation::new(input.clone()).unwrap().with_database_dir(dir).run().unwrap()
}

fn post(simulation: &SimulationInput, detectors: Vec<DetectorInput>, dir: &Path) -> Vec<DetectorOutput> {
    let input = PostProcessorInput { output_name: "pmc".into(), detectors };
    PostProcessor::new(simulation, &input).unwrap().run(dir).unwrap()
}

fn perturbed(tissue: OpticalProperties) -> Vec<OpticalProperties> { vec![air(), tissue, air()] }

fn pmc(name: &str, ops: OpticalProperties) -> DetectorInput {
    DetectorInput::new(TallyType::pMCROfRho { perturbed_regions: vec![1], rho: rho(), perturbed_ops: perturbed(ops) }).named(name)
}

fn values(outputs: &[DetectorOutput], name: &str) -> ArrayD<f64> {
    outputs.iter().find(|d| d.name == name).unwrap().real().unwrap().clone()
}

#[rstest(/**/ weighting,
         case(AbsorptionWeighting::Discrete),
         case(AbsorptionWeighting::Continuous),
)]
fn unperturbed_reweighting_reproduces_the_simulation(weighting: AbsorptionWeighting) {
    let dir = tempfile::tempdir().unwrap();
    let input = recorded(weighting);
    let simulated = simulate(&input, dir.path());

    let outputs = post(&input, vec![
        pmc("pMCROfRho", baseline()),
        DetectorInput::new(TallyType::pMCROfRhoAndTime {
            perturbed_regions: vec![1],
            rho: rho(),
            time: Bins::uniform(0.0, 0.5, 6),
            perturbed_ops: perturbed(baseline()),
        }),
    ], dir.path());

    assert_eq!(&values(&outputs, "pMCROfRho"), simulated.detector("ROfRho").unwrap().real().unwrap());
    assert_eq!(&values(&outputs, "pMCROfRhoAndTime"), simulated.detector("ROfRhoAndTime").unwrap().real().unwrap());
}

#[test]
fn more_absorption_means_less_reflectance() {
    let dir = tempfile::tempdir().unwrap();
    let input = recorded(AbsorptionWeighting::Discrete);
    simulate(&input, dir.path());
    let mut absorbing = baseline();
    absorbing.mua = 0.1;
    let outputs = post(&input, vec![pmc("base", baseline()), pmc("absorbing", absorbing)], dir.path());
    let (base, absorbing) = (values(&outputs, "base"), values(&outputs, "absorbing"));
    assert!(absorbing.iter().zip(&base).all(|(a, b)| a <= b));
    assert!(absorbing.sum() < base.sum());
}

#[rstest(/**/ derivative, perturb,
         case("dMCdROfRhodMua", (|o: OpticalProperties, h: f64| OpticalProperties::new(o.mua + h, o.musp, o.g, o.n)) as fn(OpticalProperties, f64) -> OpticalProperties),
         case("dMCdROfRhodMus", (|o: OpticalProperties, h: f64| OpticalProperties::from_mus(o.mua, o.mus() + h, o.g, o.n)) as fn(OpticalProperties, f64) -> OpticalProperties),
)]
fn derivatives_match_finite_differences(derivative: &str, perturb: fn(OpticalProperties, f64) -> OpticalProperties) {
    let dir = tempfile::tempdir().unwrap();
    let input = recorded(AbsorptionWeighting::Discrete);
    simulate(&input, dir.path());

    let ops = perturbed(baseline());
    let tally = match derivative {
        "dMCdROfRhodMua" => TallyType::dMCdROfRhodMua { perturbed_regions: vec![1], rho: rho(), perturbed_ops: ops },
        _                => TallyType::dMCdROfRhodMus { perturbed_regions: vec![1], rho: rho(), perturbed_ops: ops },
    };
    let h = 1e-5;
    let outputs = post(&input, vec![
        DetectorInput::new(tally).named("d"),
        pmc("plus",  perturb(baseline(),  h)),
        pmc("minus", perturb(baseline(), -h)),
    ], dir.path());

    let d = values(&outputs, "d");
    let fd = (values(&outputs, "plus") - values(&outputs, "minus")) / (2.0 * h);
    for (&analytic, &numeric) in d.iter().zip(&fd) {
        assert_float_eq!(analytic, numeric, abs <= 1e-9, rmax <= 1e-3);
    }
}

#[test]
fn post_processing_is_rejected_without_what_it_needs() {
    let dir = tempfile::tempdir().unwrap();
    let mut input = recorded(AbsorptionWeighting::Discrete);
    simulate(&input, dir.path());

    let reflectance = PostProcessorInput { output_name: "p".into(), detectors: vec![DetectorInput::new(TallyType::ROfRho { rho: rho() })] };
    assert!(matches!(PostProcessor::new(&input, &reflectance), Err(Error::Validation { .. })));

    let wrong_length = PostProcessorInput { output_name: "p".into(), detectors: vec![
        DetectorInput::new(TallyType::pMCROfRho { perturbed_regions: vec![1], rho: rho(), perturbed_ops: vec![baseline()] }),
    ]};
    assert!(matches!(PostProcessor::new(&input, &wrong_length), Err(Error::Validation { .. })));

    let exterior = PostProcessorInput { output_name: "p".into(), detectors: vec![
        DetectorInput::new(TallyType::pMCROfRho { perturbed_regions: vec![0], rho: rho(), perturbed_ops: perturbed(baseline()) }),
    ]};
    assert!(matches!(PostProcessor::new(&input, &exterior), Err(Error::Validation { .. })));

    input.options.absorption_weighting = AbsorptionWeighting::Analog;
    let fine = PostProcessorInput { output_name: "p".into(), detectors: vec![pmc("p", baseline())] };
    assert!(matches!(PostProcessor::new(&input, &fine), Err(Error::Validation { .. })));

    let elsewhere = tempfile::tempdir().unwrap();
    let processor = PostProcessor::new(&recorded(AbsorptionWeighting::Discrete), &fine).unwrap();
    assert!(processor.run(elsewhere.path()).is_err());
}

/// Magic plus one `u32`, for both databases
const HEADER_BYTES: u64 = 12;

fn truncate(path: &Path, len: u64) {
    OpenOptions::new().write(true).open(path).unwrap().set_len(len).unwrap();
}

#[rstest(/**/ emptied,
         case(vec![EXIT_DATABASE]),
         case(vec![COLLISION_DATABASE]),
         case(vec![EXIT_DATABASE, COLLISION_DATABASE]),
)]
fn databases_out_of_step_or_empty_are_rejected(emptied: Vec<&str>) {
    let dir = tempfile::tempdir().unwrap();
    let input = recorded(AbsorptionWeighting::Discrete);
    simulate(&input, dir.path());
    for file in emptied { truncate(&dir.path().join(file), HEADER_BYTES) }

    let post_input = PostProcessorInput { output_name: "p".into(), detectors: vec![pmc("p", baseline())] };
    let result = PostProcessor::new(&input, &post_input).unwrap().run(dir.path());
    assert!(matches!(result, Err(Error::Validation { .. })), "{result:?}");
}

#[test]
fn record_cut_short_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let input = recorded(AbsorptionWeighting::Discrete);
    simulate(&input, dir.path());
    let exits = dir.path().join(EXIT_DATABASE);
    let len = std::fs::metadata(&exits).unwrap().len();
    truncate(&exits, len - 1);

    let post_input = PostProcessorInput { output_name: "p".into(), detectors: vec![pmc("p", baseline())] };
    let result = PostProcessor::new(&input, &post_input).unwrap().run(dir.path());
    assert!(matches!(result, Err(Error::Database(_))), "{result:?}");
}
