use autopilot_sim::autopilot::{AesAutopilot, GcasAutopilot};
use autopilot_sim::dynamics::PointMassAircraft;
use autopilot_sim::error::SimError;
use autopilot_sim::gnc::{LowLevelController, RateTrackingController};
use autopilot_sim::scenario::presets;
use autopilot_sim::sim::event::mode_sequence;
use autopilot_sim::sim::{
    simulate_with, Campaign, CampaignSummary, SimulationResult, SpeedAltitudeGrid,
};
use autopilot_sim::verify::{SafetyBounds, SafetyVerifier};
use autopilot_sim::{AesMode, GcasMode};
use tracing_subscriber::EnvFilter;

fn main() -> Result<(), SimError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    // -----------------------------------------------------------------------
    // Scenario: steep inverted dive
    // -----------------------------------------------------------------------
    let scenario = presets::dive_recovery();
    let plant = PointMassAircraft::default();
    let llc = RateTrackingController::new();

    println!();
    println!("====================================================================");
    println!("  GCAS / AES SUPERVISORY AUTOPILOT — {}", scenario.name);
    println!("====================================================================");
    println!();
    let x0 = &scenario.initial_state;
    println!("  Initial Condition");
    println!("  ──────────────────────────────────────────────────────────────────");
    println!(
        "  Altitude:      {:>8.0} ft    Airspeed:     {:>8.0} ft/s",
        x0.alt(),
        x0.vt()
    );
    println!(
        "  Pitch:         {:>8.1} deg   Roll:         {:>8.1} deg",
        x0.theta().to_degrees(),
        x0.phi().to_degrees()
    );
    println!(
        "  Step:          {:>8.4} s     Budget:       {:>8.1} s",
        scenario.sim.step, scenario.sim.time_budget
    );
    println!();

    // -----------------------------------------------------------------------
    // GCAS run, judged against the full recovery envelope
    // -----------------------------------------------------------------------
    let mut gcas = GcasAutopilot::new(GcasMode::Standby, scenario.gcas.clone())?;
    let res = simulate_with(x0, &scenario.sim, &mut gcas, &plant, &llc)?;
    let recovered = report("GCAS", GcasMode::Standby, &res, &scenario.recovery_bounds, &llc);

    // -----------------------------------------------------------------------
    // AES fallback, judged on terrain clearance only
    // -----------------------------------------------------------------------
    if !recovered {
        let mut aes = AesAutopilot::new(AesMode::Waiting, scenario.aes.clone())?;
        let res = simulate_with(x0, &scenario.sim, &mut aes, &plant, &llc)?;
        report("AES", AesMode::Waiting, &res, &scenario.ejection_bounds, &llc);
    }

    // -----------------------------------------------------------------------
    // Survivability sweep over the nine speed/altitude bands
    // -----------------------------------------------------------------------
    let campaign = Campaign::from_scenario(&scenario);
    println!("  Survivability Sweep");
    println!("  ──────────────────────────────────────────────────────────────────");
    for (band, grid) in SpeedAltitudeGrid::study_bands(20, 16) {
        let reports = campaign.sweep(&grid.cases(x0))?;
        println!("  {:<22} {}", band, CampaignSummary::from_reports(&reports));
    }
    println!("====================================================================");
    println!();
    Ok(())
}

/// Print the transition log and verdict for one run. Returns whether the
/// run was complete and inside `bounds`.
fn report<M: Copy + std::fmt::Display>(
    label: &str,
    initial: M,
    res: &SimulationResult<M>,
    bounds: &SafetyBounds,
    llc: &RateTrackingController,
) -> bool {
    let modes: Vec<String> =
        mode_sequence(initial, &res.transitions).iter().map(|m| m.to_string()).collect();
    println!("  {} Run  ({:?})", label, res.status);
    println!("  ──────────────────────────────────────────────────────────────────");
    println!("  Modes:         {}", modes.join(" -> "));
    for tr in &res.transitions {
        println!("  {}", tr);
    }
    if let Some(e) = &res.failure {
        println!("  integration failed: {}", e);
    }

    let violations = SafetyVerifier::new(bounds.clone())
        .with_actuator_limits(llc.limits())
        .verify(res);
    let min_alt = res.min_altitude().unwrap_or(f64::NAN);
    println!(
        "  Samples:       {:>8}       Min altitude: {:>8.0} ft",
        res.samples.len(),
        min_alt
    );
    println!(
        "  Runtime:       {:>8.1} ms    Violations:   {:>8}",
        res.runtime.as_secs_f64() * 1e3,
        violations.len()
    );
    for v in violations.iter().take(5) {
        println!("    {}", v);
    }
    if violations.len() > 5 {
        println!("    ... {} more", violations.len() - 5);
    }

    let safe = res.status.is_complete() && violations.is_empty();
    println!("  Verdict:       {}", if safe { "SAFE" } else { "UNSAFE" });
    println!();
    safe
}
