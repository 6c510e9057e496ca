//! Filter predicate evaluation over the generated wire types.
//!
//! The record payload is opaque to the stores; only the declared filter
//! predicates below ever look inside it.

use crate::proto::{Filter, Laptop, Memory, MemoryUnit};

impl Memory {
    /// Total size in bytes, widened to avoid overflow for large values.
    pub fn bytes(&self) -> u128 {
        let shift = match self.unit() {
            MemoryUnit::Unspecified => 0,
            MemoryUnit::Kilobyte => 10,
            MemoryUnit::Megabyte => 20,
            MemoryUnit::Gigabyte => 30,
        };
        u128::from(self.value) << shift
    }
}

impl Filter {
    /// Returns true if the laptop satisfies all four filter predicates.
    ///
    /// A laptop with no CPU or RAM message fails any positive minimum.
    pub fn matches(&self, laptop: &Laptop) -> bool {
        if laptop.price_usd > self.max_price_usd {
            return false;
        }

        let (cores, min_ghz) = laptop
            .cpu
            .as_ref()
            .map(|cpu| (cpu.number_cores, cpu.min_ghz))
            .unwrap_or((0, 0.0));

        if cores < self.min_cpu_cores {
            return false;
        }

        if min_ghz < self.min_cpu_ghz {
            return false;
        }

        let ram = laptop.ram.as_ref().map(Memory::bytes).unwrap_or(0);
        let min_ram = self.min_ram.as_ref().map(Memory::bytes).unwrap_or(0);

        ram >= min_ram
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::Cpu;

    fn filter() -> Filter {
        Filter {
            max_price_usd: 2000.0,
            min_cpu_cores: 4,
            min_cpu_ghz: 2.0,
            min_ram: Some(Memory {
                value: 8,
                unit: MemoryUnit::Gigabyte as i32,
            }),
        }
    }

    fn laptop(price: f64, cores: u32, ghz: f64, ram_gb: u64) -> Laptop {
        Laptop {
            id: "test".to_string(),
            brand: "brand".to_string(),
            name: "name".to_string(),
            cpu: Some(Cpu {
                brand: "cpu".to_string(),
                number_cores: cores,
                min_ghz: ghz,
                max_ghz: ghz + 2.0,
            }),
            ram: Some(Memory {
                value: ram_gb,
                unit: MemoryUnit::Gigabyte as i32,
            }),
            price_usd: price,
        }
    }

    #[test]
    fn memory_unit_conversion() {
        let ram = Memory {
            value: 4096,
            unit: MemoryUnit::Megabyte as i32,
        };
        let four_gb = Memory {
            value: 4,
            unit: MemoryUnit::Gigabyte as i32,
        };
        assert_eq!(ram.bytes(), four_gb.bytes());
    }

    #[test]
    fn matching_laptop_passes_all_predicates() {
        assert!(filter().matches(&laptop(1500.0, 8, 2.5, 16)));
    }

    #[test]
    fn each_predicate_rejects_independently() {
        assert!(!filter().matches(&laptop(2500.0, 8, 2.5, 16)));
        assert!(!filter().matches(&laptop(1500.0, 2, 2.5, 16)));
        assert!(!filter().matches(&laptop(1500.0, 8, 1.5, 16)));
        assert!(!filter().matches(&laptop(1500.0, 8, 2.5, 4)));
    }

    #[test]
    fn missing_cpu_and_ram_fail_positive_minimums() {
        let mut bare = laptop(1500.0, 8, 2.5, 16);
        bare.cpu = None;
        bare.ram = None;
        assert!(!filter().matches(&bare));
    }
}
