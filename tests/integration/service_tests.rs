//! Integration tests for the VentilatorService → controller → actuators
//! pipeline, including the events it emits.

use respirator::alarms::{AlarmCode, AlarmPriority};
use respirator::app::commands::AppCommand;
use respirator::app::events::AppEvent;
use respirator::cycle::CycleSubPhase;
use respirator::error::SensorError;

use crate::mock_hw::{BlowerCall, LogSink, Rig, ScriptedPressure, scenario_config};

#[test]
fn tick_before_start_does_nothing() {
    let mut rig = Rig::new();
    let mut svc = rig.service(&scenario_config());
    let mut sink = LogSink::new();
    let mut source = ScriptedPressure::constant(20.0);

    assert!(svc.tick(&mut source, &mut sink).is_none());
    assert_eq!(svc.tick_count(), 0);
    assert!(sink.events.is_empty());
    assert!(svc.controller().blower().calls.is_empty());
}

#[test]
fn start_positions_actuators() {
    let mut rig = Rig::new();
    let mut svc = rig.service(&scenario_config());
    let mut sink = LogSink::new();

    svc.handle_command(AppCommand::Start, &mut sink);

    assert!(svc.is_running());
    assert!(matches!(
        sink.events.as_slice(),
        [AppEvent::Started(CycleSubPhase::Inspiration)]
    ));
    let c = svc.controller();
    assert_eq!(c.blower().calls, vec![BlowerCall::SetSpeed(170)]);
    assert_eq!(c.blower_valve().angle, 145);
    assert_eq!(c.patient_valve().angle, 145);
}

#[test]
fn full_cycle_emits_phase_and_cycle_events() {
    let mut rig = Rig::new();
    let mut svc = rig.service(&scenario_config());
    let mut sink = LogSink::new();
    let mut source = ScriptedPressure::constant(20.0);

    svc.start(&mut sink);
    for _ in 0..400 {
        svc.tick(&mut source, &mut sink);
    }

    let phases: Vec<_> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::SubPhaseChanged { cycle, from, to } => Some((*cycle, *from, *to)),
            _ => None,
        })
        .collect();
    assert_eq!(
        phases,
        vec![
            (1, CycleSubPhase::Inspiration, CycleSubPhase::HoldInspiration),
            (1, CycleSubPhase::HoldInspiration, CycleSubPhase::Exhale),
            (2, CycleSubPhase::Exhale, CycleSubPhase::Inspiration),
        ]
    );

    let stats = sink.events.iter().find_map(|e| match e {
        AppEvent::CycleCompleted(s) => Some(*s),
        _ => None,
    });
    let stats = stats.expect("cycle completed");
    assert_eq!(stats.cycle, 1);
    assert_eq!(stats.peak_pressure, 20.0);
    assert_eq!(stats.plateau_pressure, 20.0);
    assert_eq!(stats.peep, 20.0);

    // Default telemetry interval is 100 ticks.
    assert_eq!(sink.count(|e| matches!(e, AppEvent::Telemetry(_))), 4);
}

#[test]
fn alarm_events_follow_alarm_state() {
    let mut rig = Rig::new();
    let mut svc = rig.service(&scenario_config());
    let mut sink = LogSink::new();
    let mut source = ScriptedPressure::constant(20.0);
    source.push(Ok(45.0));

    svc.start(&mut sink);
    svc.tick(&mut source, &mut sink);
    assert!(sink.events.iter().any(|e| matches!(
        e,
        AppEvent::AlarmRaised {
            code: AlarmCode::PeakPressureHigh,
            priority: AlarmPriority::High,
            cycle: 1,
        }
    )));

    for _ in 1..800 {
        svc.tick(&mut source, &mut sink);
    }
    let raised = sink.count(|e| matches!(e, AppEvent::AlarmRaised { .. }));
    assert_eq!(raised, 1);
    assert!(sink.events.iter().any(|e| matches!(
        e,
        AppEvent::AlarmCleared {
            code: AlarmCode::PeakPressureHigh,
            cycle: 3,
        }
    )));
}

#[test]
fn failed_read_reuses_previous_pressure() {
    let mut rig = Rig::new();
    let mut svc = rig.service(&scenario_config());
    let mut sink = LogSink::new();
    let mut source = ScriptedPressure::constant(20.0);
    source.push(Ok(12.0));
    source.push(Err(SensorError::AdcReadFailed));

    svc.start(&mut sink);
    svc.tick(&mut source, &mut sink);
    svc.tick(&mut source, &mut sink);

    assert_eq!(svc.controller().pressure(), 12.0);
    assert_eq!(svc.sensor_faults(), 1);
    assert_eq!(svc.controller().rejected_samples(), 0);
    assert_eq!(svc.tick_count(), 2);
}

#[test]
fn stop_vents_patient_and_restart_begins_new_cycle() {
    let mut rig = Rig::new();
    let mut svc = rig.service(&scenario_config());
    let mut sink = LogSink::new();
    let mut source = ScriptedPressure::constant(20.0);

    svc.start(&mut sink);
    for _ in 0..10 {
        svc.tick(&mut source, &mut sink);
    }
    svc.handle_command(AppCommand::Stop, &mut sink);

    assert!(!svc.is_running());
    assert!(matches!(sink.events.last(), Some(AppEvent::Stopped)));
    assert_eq!(svc.controller().blower().calls.last(), Some(&BlowerCall::Stop));
    assert_eq!(svc.controller().patient_valve().angle, 25);
    assert!(svc.tick(&mut source, &mut sink).is_none());

    svc.handle_command(AppCommand::Start, &mut sink);
    assert_eq!(svc.controller().cycle_number(), 2);
    assert_eq!(svc.controller().sub_phase(), CycleSubPhase::Inspiration);
    assert_eq!(sink.count(|e| matches!(e, AppEvent::Started(_))), 2);
}

#[test]
fn restart_reports_alarms_it_drops() {
    let mut rig = Rig::new();
    let mut svc = rig.service(&scenario_config());
    let mut sink = LogSink::new();
    let mut source = ScriptedPressure::constant(45.0);

    svc.start(&mut sink);
    svc.tick(&mut source, &mut sink);
    assert!(svc.controller().alarms().is_active(AlarmCode::PeakPressureHigh));

    svc.handle_command(AppCommand::Stop, &mut sink);
    svc.handle_command(AppCommand::Start, &mut sink);

    assert!(svc.controller().alarms().active().is_empty());
    let raised = sink.count(|e| matches!(e, AppEvent::AlarmRaised { .. }));
    let cleared = sink.count(|e| {
        matches!(
            e,
            AppEvent::AlarmCleared {
                code: AlarmCode::PeakPressureHigh,
                ..
            }
        )
    });
    assert_eq!((raised, cleared), (1, 1));
    assert!(matches!(sink.events.last(), Some(AppEvent::Started(_))));
}

#[test]
fn clear_alarm_command_acknowledges_active_alarm() {
    let mut rig = Rig::new();
    let mut svc = rig.service(&scenario_config());
    let mut sink = LogSink::new();
    let mut source = ScriptedPressure::constant(45.0);

    svc.start(&mut sink);
    svc.tick(&mut source, &mut sink);
    assert!(svc.controller().alarms().is_active(AlarmCode::PeakPressureHigh));

    svc.handle_command(AppCommand::ClearAlarm(AlarmCode::PeakPressureHigh), &mut sink);
    assert!(!svc.controller().alarms().is_active(AlarmCode::PeakPressureHigh));
    assert!(matches!(
        sink.events.last(),
        Some(AppEvent::AlarmCleared {
            code: AlarmCode::PeakPressureHigh,
            ..
        })
    ));

    let before = sink.events.len();
    svc.handle_command(AppCommand::ClearAlarm(AlarmCode::PeepTooLow), &mut sink);
    assert_eq!(sink.events.len(), before);
}

#[test]
fn machine_snapshot_reports_previous_cycle() {
    let mut rig = Rig::new();
    let mut svc = rig.service(&scenario_config());
    let mut sink = LogSink::new();
    let mut source = ScriptedPressure::constant(25.0);

    svc.start(&mut sink);
    // 134 inhalation ticks at 25, then 266 exhale ticks at 3.
    for _ in 0..134 {
        svc.tick(&mut source, &mut sink);
    }
    source.fallback = 3.0;
    for _ in 0..266 {
        svc.tick(&mut source, &mut sink);
    }

    let snap = svc.machine_snapshot();
    assert_eq!(snap.cycle, 2);
    assert_eq!(snap.previous_peak_pressure, 25.0);
    assert_eq!(snap.previous_plateau_pressure, 25.0);
    assert_eq!(snap.previous_peep, 3.0);
    assert_eq!(snap.current_alarms.as_slice(), &[AlarmCode::PeepTooLow.code()]);
    assert!(snap.previous_cycle_alarms.is_empty());
    assert_eq!(snap.settings.min_peep_command, 5.0);
}

#[test]
fn telemetry_follows_configured_interval() {
    let mut config = scenario_config();
    config.telemetry_interval_ticks = 10;
    let mut rig = Rig::new();
    let mut svc = rig.service(&config);
    let mut sink = LogSink::new();
    let mut source = ScriptedPressure::constant(18.0);

    svc.start(&mut sink);
    for _ in 0..25 {
        svc.tick(&mut source, &mut sink);
    }

    let telemetry: Vec<_> = sink
        .events
        .iter()
        .filter_map(|e| match e {
            AppEvent::Telemetry(t) => Some(t.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(telemetry.len(), 2);
    let t = &telemetry[1];
    assert_eq!(t.cycle, 1);
    assert_eq!(t.sub_phase, CycleSubPhase::Inspiration);
    assert_eq!(t.pressure, 18.0);
    assert_eq!(t.blower_speed, 170);
    assert!(t.alarms.is_empty());
}
