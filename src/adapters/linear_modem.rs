//! Linear constellation modems (PSK and square QAM, Gray coded)

use std::f32::consts::PI;

use crate::domain::{ModulationScheme, Sample};
use crate::ports::Modem;

fn gray(n: u32) -> u32 {
    n ^ (n >> 1)
}

/// Table-driven modem with unit average symbol energy
#[derive(Debug, Clone)]
pub struct LinearModem {
    scheme: ModulationScheme,
    constellation: Vec<Sample>,
}

impl LinearModem {
    pub fn new(scheme: ModulationScheme) -> Self {
        let constellation = match scheme {
            ModulationScheme::Bpsk => vec![Sample::new(1.0, 0.0), Sample::new(-1.0, 0.0)],
            ModulationScheme::Qpsk => {
                let a = std::f32::consts::FRAC_1_SQRT_2;
                (0..4u32)
                    .map(|s| {
                        let i = if s & 0b10 != 0 { -a } else { a };
                        let q = if s & 0b01 != 0 { -a } else { a };
                        Sample::new(i, q)
                    })
                    .collect()
            }
            ModulationScheme::Psk8 => {
                let mut table = vec![Sample::new(0.0, 0.0); 8];
                for position in 0..8u32 {
                    let theta = 2.0 * PI * position as f32 / 8.0;
                    table[gray(position) as usize] = Sample::from_polar(1.0, theta);
                }
                table
            }
            ModulationScheme::Qam16 => {
                // average energy of the {-3,-1,1,3}^2 grid is 10
                let scale = 1.0 / 10.0_f32.sqrt();
                let mut levels = [0.0f32; 4];
                for position in 0..4u32 {
                    levels[gray(position) as usize] = (2.0 * position as f32 - 3.0) * scale;
                }
                (0..16u32)
                    .map(|s| Sample::new(levels[(s >> 2) as usize], levels[(s & 0b11) as usize]))
                    .collect()
            }
        };
        Self {
            scheme,
            constellation,
        }
    }

    pub fn constellation(&self) -> &[Sample] {
        &self.constellation
    }
}

impl Modem for LinearModem {
    fn scheme(&self) -> ModulationScheme {
        self.scheme
    }

    fn modulate(&self, symbol: u32) -> Sample {
        let mask = self.constellation.len() - 1;
        self.constellation[symbol as usize & mask]
    }

    fn demodulate(&self, sample: Sample) -> u32 {
        let mut best = 0;
        let mut best_dist = f32::INFINITY;
        for (index, point) in self.constellation.iter().enumerate() {
            let dist = (sample - *point).norm_sqr();
            if dist < best_dist {
                best_dist = dist;
                best = index;
            }
        }
        best as u32
    }
}
