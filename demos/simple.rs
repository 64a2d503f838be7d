use buoy_fusion::Fusion;
use nalgebra::Vector3;

const SAMPLE_PERIOD: f32 = 0.01; // 10 ms sample period

fn main() {
    let mut fusion = Fusion::new();

    for _ in 0..10 {
        // this loop should repeat each time new sensor data is available
        let accelerometer = Vector3::new(0.0, 0.0, 1.0); // replace this with calibrated accelerometer data in g
        let gyroscope = Vector3::new(0.0, 0.0, 0.0); // replace this with calibrated gyroscope data in degrees/s
        let magnetometer = Vector3::new(200.0, 0.0, -400.0); // replace this with aligned magnetometer data in mG

        fusion.update(accelerometer, gyroscope, magnetometer, SAMPLE_PERIOD);

        let angles = fusion.euler_angles();
        let earth_z = fusion.earth_acceleration().z;

        println!(
            "Roll: {:.2}, Pitch: {:.2}, Yaw: {:.2}, Earth Z: {:.3} g",
            angles.roll, angles.pitch, angles.yaw, earth_z
        );
    }
}
