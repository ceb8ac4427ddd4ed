use std::f64::consts::TAU;
use ndarray as nd;
use jaynes_cummings_sim::{
    config::{ SimConfig, SpectrumSpec, TimeSpec },
    dynamics::{ CouplingKind, DecayRates, HBuilderJC, JCParams, LOperatorJC },
    error::Error,
    hilbert::{ AtomLevel, atom_density, fock_density, product_density },
    rabi::{ IntegratorConfig, lindblad::evolve_with },
    spectrum::{
        CorrelationStart,
        Correlator,
        SpectrumSetup,
        correlation_2op_1t,
        spectrum_fft,
        sweep_coupling,
    },
    time::TimeGrid,
    wigner::{ default_axis, wigner_series },
};

fn excited_vacuum_setup(rates: DecayRates) -> SpectrumSetup {
    let rho0 = product_density(
        &fock_density(3, 0).unwrap(),
        &atom_density(AtomLevel::Excited),
    );
    SpectrumSetup {
        // rotating frame: the bare frequencies drop out
        params: JCParams::new(0.0, 0.0, 0.0),
        cavity_dim: 3,
        rates,
        coupling: CouplingKind::RotatingWave,
        correlator: Correlator::Atom,
        start: CorrelationStart::State(rho0),
        tau: TimeGrid::linspace(0.0, 60.0, 1201).unwrap(),
        integrator: IntegratorConfig::default(),
    }
}

#[test]
fn strong_coupling_splits_spectrum() {
    let setup = excited_vacuum_setup(DecayRates::new(0.2, 0.2, 0.0));
    let resolution = TAU / (60.0 + 0.05);
    let sweep = sweep_coupling(&setup, &[0.5, 1.0]).unwrap();
    assert_eq!(sweep.len(), 2);
    assert_eq!(sweep[0].g, 0.5);
    assert_eq!(sweep[1].g, 1.0);
    for point in sweep.iter() {
        let peaks = point.spectrum.peaks(0.5);
        assert_eq!(peaks.len(), 2, "g = {}: {:?}", point.g, peaks);
        assert!((peaks[0].0 + point.g).abs() < resolution);
        assert!((peaks[1].0 - point.g).abs() < resolution);
        let split = point.spectrum.splitting(0.5).unwrap();
        assert!((split - 2.0 * point.g).abs() < 2.0 * resolution);
        assert!(point.spectrum.density.iter().all(|s| *s >= 0.0));
    }
    assert!(
        sweep[1].spectrum.splitting(0.5).unwrap()
            > sweep[0].spectrum.splitting(0.5).unwrap()
    );
}

#[test]
fn weak_coupling_gives_single_peak() {
    let setup = excited_vacuum_setup(DecayRates::new(2.0, 2.0, 0.0));
    let point = setup.run(0.05).unwrap();
    let peaks = point.spectrum.peaks(0.5);
    assert_eq!(peaks.len(), 1, "{:?}", peaks);
    assert!(peaks[0].0.abs() < TAU / 60.0);
}

#[test]
fn correlation_starts_at_initial_expectation() {
    let setup = excited_vacuum_setup(DecayRates::new(0.2, 0.2, 0.0));
    let hbuilder = HBuilderJC::new(setup.params.with_g(1.0), 3).unwrap();
    let lop = LOperatorJC::from_hbuilder(&hbuilder, setup.rates).unwrap();
    let ops = hbuilder.ops();
    let corr = correlation_2op_1t(
        &hbuilder, &lop, &setup.start, &setup.tau, &ops.sp, &ops.sm,
        &setup.integrator,
    ).unwrap();
    // <σ₊σ₋> = P_e = 1 at τ = 0, then cos(g τ) exp(-γ τ / 2) for κ = γ
    assert!((corr[0].re - 1.0).abs() < 1e-12);
    for (tau, c) in setup.tau.iter().zip(corr.iter()).step_by(50) {
        let expected = tau.cos() * (-0.1 * tau).exp();
        assert!((c.re - expected).abs() < 1e-5);
        assert!(c.im.abs() < 1e-5);
    }
}

#[test]
fn steady_state_start_requires_dissipation() {
    let mut setup = excited_vacuum_setup(DecayRates::closed());
    setup.start = CorrelationStart::SteadyState;
    assert!(matches!(setup.run(1.0), Err(Error::Configuration(_))));
}

#[test]
fn spectrum_needs_uniform_grid() {
    let tau = TimeGrid::try_from(vec![0.0, 0.1, 0.25, 0.3]).unwrap();
    let corr: nd::Array1<num_complex::Complex64> = nd::Array1::zeros(4);
    assert!(matches!(spectrum_fft(&tau, &corr), Err(Error::Configuration(_))));

    let mut setup = excited_vacuum_setup(DecayRates::new(0.2, 0.2, 0.0));
    setup.tau = tau;
    assert!(matches!(sweep_coupling(&setup, &[1.0]), Err(Error::Configuration(_))));
}

#[test]
fn wigner_snapshots_normalized() {
    let hbuilder = HBuilderJC::new(JCParams::new(1.0, 1.0, 0.5), 8).unwrap();
    let lop = LOperatorJC::from_hbuilder(&hbuilder, DecayRates::new(0.1, 0.05, 0.0))
        .unwrap();
    let rho0 = product_density(
        &fock_density(8, 1).unwrap(),
        &atom_density(AtomLevel::Excited),
    );
    let t = TimeGrid::linspace(0.0, 10.0, 41).unwrap();
    let traj = evolve_with(&rho0, &hbuilder, &lop, &t, &IntegratorConfig::default())
        .unwrap();
    let x = default_axis();
    let series = wigner_series(&traj, &[0.0, 2.6, 5.0, 10.0], &x, &x).unwrap();
    assert_eq!(series.w.shape(), &[200, 200, 4]);
    assert_eq!(series.t[1], 2.5);
    for integral in series.integrals().iter() {
        assert!((integral - 1.0).abs() < 1e-3);
    }
    // the initial single-photon state is non-classical
    assert!(series.grid(0).unwrap().min() < 0.0);
}

fn small_config() -> SimConfig {
    SimConfig {
        cavity_dim: 4,
        spectrum: SpectrumSpec {
            tau: TimeSpec { start: 0.0, stop: 50.0, num: 1001 },
            ..Default::default()
        },
        ..Default::default()
    }
}

#[test]
fn default_spectrum_shows_vacuum_rabi_doublet() {
    // default settings: cavity correlator from the thermal steady state
    let config = small_config();
    let g = config.g_sweep[config.g_sweep.len() - 1];
    let point = config.spectrum_setup().unwrap().run(g).unwrap();
    assert!(point.spectrum.density.iter().any(|s| *s > 0.0));
    let peaks = point.spectrum.peaks(0.5);
    assert_eq!(peaks.len(), 2, "{:?}", peaks);
    let resolution = TAU / 50.05;
    assert!((peaks[0].0 - (config.omega_c - g)).abs() < resolution);
    assert!((peaks[1].0 - (config.omega_c + g)).abs() < resolution);
}

#[test]
fn vanishing_correlation_rejected() {
    // with no bath the steady state is |0, g>, and a |0, g> = 0
    let mut config = small_config();
    config.spectrum.n_th = 0.0;
    let setup = config.spectrum_setup().unwrap();
    assert!(matches!(setup.run(1.0), Err(Error::Configuration(_))));
}

#[test]
fn configured_wigner_snapshots() {
    let config = SimConfig { cavity_dim: 6, ..Default::default() };
    let traj = evolve_with(
        &config.initial_density().unwrap(),
        &config.hbuilder().unwrap(),
        &config.loperator().unwrap(),
        &config.time_grid().unwrap(),
        &config.integrator(),
    ).unwrap();
    let axis = config.phase_space.axis();
    assert_eq!(axis.len(), config.phase_space.num);
    let times = &config.phase_space.times;
    let series = wigner_series(&traj, times, &axis, &axis).unwrap();
    assert_eq!(series.w.shape(), &[200, 200, times.len()]);
    let half_step = 25.0 / 99.0 / 2.0;
    for (used, requested) in series.t.iter().zip(times.iter()) {
        assert!((used - requested).abs() <= half_step + 1e-12);
    }
    for integral in series.integrals().iter() {
        assert!((integral - 1.0).abs() < 1e-3);
    }
}
