//! Main alignment executable entry point.
//!
//! # Architecture
//!
//! The executable runs one alignment in simulation. The general execution methodology consists
//! of:
//!
//!     - Initialise all modules
//!     - Select the nearest goal and begin the alignment
//!     - Main loop:
//!         - Simulated drive and camera stepping
//!         - Odometry update of the fused pose
//!         - Vision processing
//!         - Alignment control processing
//!         - Drive command output
//!         - Archiving
//!
//! The loop stops when the alignment settles on its goal, or when the alignment timeout expires.
//!
//! # Modules
//!
//! All cyclic modules (e.g. `align_ctrl`) shall meet the following requirements:
//!     1. Provide a public struct implementing the `util::module::State` trait.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use std::thread;
use std::time::{Duration, Instant};
use structopt::StructOpt;

// Internal
use align_lib::{
    align_ctrl::{self, AlignCtrl, AlignRequest, ProfileMode},
    data_store::{DataStore, SafeModeCause},
    field::{Alliance, FieldLayout},
    goal::{self, GoalCatalog, GoalVariant, Selection},
    loc::{self, FusedPose, MeanResolver, PoseHandle, VisionMgr},
    params::AlignExecParams,
    sim::{SimCamera, SimDrive},
};
use comms_if::{eqpt::drive::DriveActuator, geom::Pose2D, loc::PoseSource};
use util::{
    archive::{Archived, Archiver},
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command line arguments
#[derive(Debug, StructOpt)]
#[structopt(name = "align_exec", about = "Simulated alignment onto the nearest goal")]
struct Args {
    /// Alliance to play for, blue or red
    #[structopt(short, long, default_value = "blue")]
    alliance: Alliance,

    /// Only align onto goals of this variant (left, right or center)
    #[structopt(short, long)]
    variant: Option<GoalVariant>,

    /// Use the slow profile limits
    #[structopt(long)]
    slow: bool,

    /// Start pose on the blue alliance as x_m y_m heading_deg, overriding exec.toml
    #[structopt(long, number_of_values = 3, allow_hyphen_values = true)]
    start: Option<Vec<f64>>,

    /// Run as fast as possible rather than in real time
    #[structopt(long)]
    fast_forward: bool,

    /// Minimum log level
    #[structopt(long, default_value = "info")]
    log_level: LevelFilter,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    let args = Args::from_args();

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("align_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(args.log_level, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Alignment Executable\n");
    info!("Session directory: {:?}\n", session.session_root);
    debug!("CLI arguments: {:?}", args);

    // ---- LOAD PARAMETERS ----

    let exec_params: AlignExecParams =
        util::params::load("exec.toml").wrap_err("Could not load exec params")?;

    let loc_params: loc::Params = util::params::load("vision.toml")
        .map_err(loc::LocError::ParamLoadError)
        .wrap_err("Could not load vision params")?;
    loc_params
        .validate()
        .wrap_err("Invalid vision params")?;

    let goal_params: goal::Params = util::params::load("goals.toml")
        .map_err(goal::GoalError::ParamLoadError)
        .wrap_err("Could not load goal params")?;

    let layout = FieldLayout::load(&exec_params.field_layout_file)
        .wrap_err("Could not load the field layout")?;

    exec_params
        .sim
        .validate()
        .wrap_err("Invalid simulation params")?;

    if !(exec_params.cycle_period_s > 0.0) {
        return Err(eyre!(
            "Cycle period must be positive, found {}",
            exec_params.cycle_period_s
        ));
    }

    info!("Exec parameters loaded");

    // ---- INITIALISE DATASTORE ----

    info!("Initialising modules...");

    let mut ds = DataStore::default();
    let cycle_frequency_hz = 1.0 / exec_params.cycle_period_s;

    // ---- INITIALISE MODULES ----

    let catalog = GoalCatalog::for_alliance(&layout, &goal_params, args.alliance)
        .wrap_err("Failed to build the goal catalog")?;

    // Start pose, in the alliance's own half of the field
    let start = match args.start {
        Some(ref s) => [s[0], s[1], s[2]],
        None => exec_params.start_pose,
    };
    let mut true_start = Pose2D::from_degrees(start[0], start[1], start[2]);
    if args.alliance == Alliance::Red {
        true_start = layout.mirror(&true_start);
    }

    let err = exec_params.sim.initial_est_error;
    let est_start = Pose2D::new(
        true_start.x() + err[0],
        true_start.y() + err[1],
        true_start.heading_rad + err[2],
    );

    let mut pose_handle = PoseHandle::new(FusedPose::new(
        loc_params.fused_pose.clone(),
        est_start,
        0.0,
    ));
    info!("FusedPose init complete");

    let mut vision_mgr = VisionMgr::new(loc_params, layout.clone(), MeanResolver);
    info!("VisionMgr init complete");

    let mut align_ctrl = AlignCtrl::new(Box::new(pose_handle.clone()));
    align_ctrl
        .init_logged("align_ctrl.toml", &session)
        .wrap_err("Failed to initialise AlignCtrl")?;

    let mut drive = SimDrive::new(exec_params.sim.drive.clone(), true_start);
    let mut cams: Vec<SimCamera> = exec_params
        .sim
        .cameras
        .iter()
        .enumerate()
        .map(|(i, p)| SimCamera::new(p.clone(), layout.clone(), exec_params.sim.seed + i as u64))
        .collect();
    info!("Simulation init complete ({} cameras)", cams.len());

    let mut cycle_arch = Archiver::from_path(&session, "align_exec/cycle.csv")
        .wrap_err("Failed to create the cycle archive")?;

    info!("Module initialisation complete\n");

    // ---- BEGIN ALIGNMENT ----

    let request = AlignRequest {
        variant: args.variant,
        mode: if args.slow {
            ProfileMode::Slow
        } else {
            exec_params.profile_mode
        },
    };

    match align_ctrl
        .begin_nearest(&catalog, request)
        .wrap_err("Failed to begin the alignment")?
    {
        Selection::Goal(goal) => info!(
            "Aligning to {:?} goal of landmark {} at ({:.3}, {:.3}, {:.1} deg)\n",
            goal.variant,
            goal.landmark_id,
            goal.pose.x(),
            goal.pose.y(),
            goal.pose.heading_rad.to_degrees()
        ),
        Selection::NoTargets(_) => {
            warn!("No goals available, nothing to align to");
            return Ok(());
        }
    }

    // ---- MAIN LOOP ----

    info!("Begining main loop\n");

    loop {
        // Get cycle start time
        let cycle_start_instant = Instant::now();

        // Clear items that need wiping at the start of the cycle
        ds.cycle_start(cycle_frequency_hz);

        // ---- DATA INPUT ----

        ds.sim_time_s += exec_params.cycle_period_s;

        let odom = drive.step(exec_params.cycle_period_s);
        pose_handle.apply_odometry(ds.sim_time_s, &odom);

        ds.true_pose = drive.true_pose();
        for cam in cams.iter_mut() {
            cam.step(ds.sim_time_s, &ds.true_pose);
        }

        // ---- LOCALISATION ----

        ds.vision_status_rpt = vision_mgr.proc(&mut cams, &mut pose_handle);
        ds.est_pose = pose_handle.current_pose();

        // ---- CONTROL ALGORITHM PROCESSING ----

        let input = align_ctrl::InputData {
            cycle_period_s: exec_params.cycle_period_s,
        };
        ds.align_ctrl_input = Some(input);

        match align_ctrl.proc(&input) {
            Ok((o, r)) => {
                ds.align_ctrl_output = o;
                ds.align_ctrl_status_rpt = r;
            }
            Err(e) => {
                warn!("Error during AlignCtrl processing: {}", e);
                ds.make_safe(SafeModeCause::AlignCtrlError);
            }
        };

        if ds.sim_time_s > exec_params.align_timeout_s && !align_ctrl.at_goal() {
            ds.make_safe(SafeModeCause::AlignTimeout);
        }

        // ---- DRIVE OUTPUT ----

        if ds.safe {
            align_ctrl.abort();
            drive.stop();
        } else if let Some(cmd) = ds.align_ctrl_output {
            drive.run_velocity(cmd);
        }

        // ---- WRITE ARCHIVES ----

        if let Err(e) = align_ctrl.write() {
            warn!("Could not archive AlignCtrl: {}", e);
        }
        if let Err(e) = cycle_arch.serialise(ds.cycle_record()) {
            warn!("Could not archive the cycle record: {}", e);
        }

        if ds.is_1_hz_cycle {
            info!(
                "t = {:.1} s, {:.3} m from goal, estimate error {:.3} m, {} samples fused",
                ds.sim_time_s,
                ds.align_ctrl_status_rpt.dist_to_goal_m,
                ds.est_pose.distance_to(&ds.true_pose),
                ds.vision_status_rpt.num_fused
            );
        }

        // ---- END CONDITIONS ----

        if align_ctrl.at_goal() {
            drive.stop();
            info!("Alignment settled after {:.2} s", ds.sim_time_s);
            break;
        }

        if ds.safe {
            break;
        }

        // ---- CYCLE MANAGEMENT ----

        let cycle_dur = Instant::now() - cycle_start_instant;

        if !args.fast_forward {
            // Get sleep duration
            match Duration::from_secs_f64(exec_params.cycle_period_s).checked_sub(cycle_dur) {
                Some(d) => {
                    ds.num_consec_cycle_overruns = 0;
                    thread::sleep(d);
                }
                None => {
                    warn!(
                        "Cycle overran by {:.06} s",
                        cycle_dur.as_secs_f64() - exec_params.cycle_period_s
                    );
                    ds.num_consec_cycle_overruns += 1;
                }
            }
        }

        // Increment cycle counter
        ds.num_cycles += 1;
    }

    // ---- SHUTDOWN ----

    let final_true = drive.true_pose();
    info!(
        "Final pose ({:.3}, {:.3}, {:.1} deg), estimate error {:.3} m",
        final_true.x(),
        final_true.y(),
        final_true.heading_rad.to_degrees(),
        pose_handle.current_pose().distance_to(&final_true)
    );

    info!("End of execution");

    match ds.safe_cause {
        Some(SafeModeCause::AlignTimeout) => Err(eyre!(
            "Alignment did not settle within {} s",
            exec_params.align_timeout_s
        )),
        Some(SafeModeCause::AlignCtrlError) => Err(eyre!("Alignment stopped by an AlignCtrl error")),
        None => Ok(()),
    }
}
