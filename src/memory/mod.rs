use hashbrown::HashMap;

use crate::chunk::Chunk;
use crate::objects::{
    AllocationObj, ClassObj, FuncObj, GcId, HeapObject, InstanceObj, StrObj, Value,
};

/// The number of collection cycles an object must survive before it is
/// promoted into the old generation.
pub const PROMOTION_AGE: u8 = 2;

/// The generation a heap object currently belongs to. Young objects are
/// scanned on every cycle; old objects only when their generation's byte
/// count has outgrown its threshold.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Generation {
    Young,
    Old,
}

/// The header shared by every heap object: its mark bit, survival count,
/// generation, and the byte-size estimate recorded when it was allocated.
#[derive(Copy, Clone)]
pub struct ObjHeader {
    pub marked: bool,
    pub age: u8,
    pub generation: Generation,
    pub size: usize,
}

/// An object stored in the garbage collector.
pub struct GcVal {
    pub header: ObjHeader,
    pub obj: HeapObject,
}

/// The root set the collector traces from: the interpreter's value stack
/// and its globals mapping. Everything live must be reachable from here.
pub struct Roots<'a> {
    pub stack: &'a [Value],
    pub globals: &'a HashMap<String, Value>,
}

/// Tuning knobs for the collector. The defaults match the stock
/// interpreter; tests shrink the thresholds to force frequent cycles.
pub struct GcConfig {
    /// Young-generation byte threshold that triggers a collection.
    pub threshold_young: usize,
    /// Old-generation byte threshold that widens a collection to both
    /// generations.
    pub threshold_old: usize,
    /// Multiplier applied to the young threshold after every sweep.
    pub grow_young: usize,
    /// Multiplier applied to the old threshold after every sweep.
    pub grow_old: usize,
}

impl Default for GcConfig {
    fn default() -> Self {
        Self {
            threshold_young: 1024,
            threshold_old: 2048,
            grow_young: 1,
            grow_old: 1,
        }
    }
}

/// The garbage collector. Owns the lifetime of every heap object.
///
/// Objects live in a central table of slots indexed by `GcId`; freed
/// slots become tombstones that later allocations reuse. Collection is
/// a tri-color mark-sweep over one or both generations, rooted in the
/// interpreter's stack and globals.
pub struct GarbageCollector {
    /// The object table. `None` slots are tombstones.
    slots: Vec<Option<GcVal>>,
    /// Indices of freed slots that can be reused.
    tombstones: Vec<usize>,
    /// The worklist of marked-but-untraced objects.
    gray: Vec<GcId>,
    bytes_young: usize,
    bytes_old: usize,
    threshold_young: usize,
    threshold_old: usize,
    grow_young: usize,
    grow_old: usize,
}

impl GarbageCollector {
    /// Creates a collector with the stock thresholds.
    pub fn new() -> Self {
        Self::with_config(GcConfig::default())
    }

    /// Creates a collector with the provided tuning knobs.
    pub fn with_config(config: GcConfig) -> Self {
        Self {
            slots: Vec::new(),
            tombstones: Vec::new(),
            gray: Vec::new(),
            bytes_young: 0,
            bytes_old: 0,
            threshold_young: config.threshold_young,
            threshold_old: config.threshold_old,
            grow_young: config.grow_young,
            grow_old: config.grow_old,
        }
    }

    /// Allocates a string object.
    pub fn alloc_string(&mut self, text: String, roots: Option<Roots>) -> GcId {
        self.allocate(HeapObject::Str(StrObj { text }), roots)
    }

    /// Allocates a function object. The function takes ownership of its chunk.
    pub fn alloc_function(
        &mut self,
        name: GcId,
        chunk: Chunk,
        arity: u8,
        roots: Option<Roots>,
    ) -> GcId {
        self.allocate(HeapObject::Function(FuncObj { name, chunk, arity }), roots)
    }

    /// Allocates a class object.
    pub fn alloc_class(&mut self, name: GcId, roots: Option<Roots>) -> GcId {
        self.allocate(HeapObject::Class(ClassObj { name }), roots)
    }

    /// Allocates an instance of the given class, with no fields set.
    pub fn alloc_instance(&mut self, class: GcId, roots: Option<Roots>) -> GcId {
        self.allocate(
            HeapObject::Instance(InstanceObj {
                class,
                fields: HashMap::new(),
            }),
            roots,
        )
    }

    /// Allocates a raw block of the given size in kilobytes.
    pub fn alloc_allocation(&mut self, kilobytes: usize, roots: Option<Roots>) -> GcId {
        self.allocate(
            HeapObject::Allocation(AllocationObj {
                kilobytes,
                block: vec![0u8; kilobytes * 1024],
            }),
            roots,
        )
    }

    /// Stores a new object in the table and hands back its id.
    ///
    /// When a root set is provided and either generation has outgrown its
    /// threshold, a collection cycle runs *before* the object is
    /// constructed, so the new object can never be swept by the cycle its
    /// own allocation triggered. Allocations made while compiling pass no
    /// roots and skip collection; interpretation has not started yet, so
    /// there is no root set to trace from.
    ///
    /// ## Arguments
    /// * `obj` – The new object to add to the garbage collector.
    /// * `roots` – The interpreter's root set, if the interpreter is running.
    ///
    /// ## Returns
    /// `GcId` – The handle of the stored object.
    fn allocate(&mut self, obj: HeapObject, roots: Option<Roots>) -> GcId {
        if let Some(roots) = roots {
            if self.bytes_young > self.threshold_young || self.bytes_old > self.threshold_old {
                self.collect(&roots);
            }
        }

        let size = object_size(&obj);
        self.bytes_young += size;

        let val = GcVal {
            header: ObjHeader {
                marked: false,
                age: 0,
                generation: Generation::Young,
                size,
            },
            obj,
        };

        let id = match self.tombstones.pop() {
            Some(idx) => {
                self.slots[idx] = Some(val);
                GcId(idx)
            }
            None => {
                self.slots.push(Some(val));
                GcId(self.slots.len() - 1)
            }
        };

        #[cfg(feature = "gc-log")]
        eprintln!(
            "[GC] alloc slot {} ({:?}, {} bytes, young total {})",
            id.0,
            self.get(&id).obj.kind(),
            size,
            self.bytes_young
        );

        id
    }

    /// Gets an immutable reference into the `GcVal` associated with the given `GcId`.
    pub fn get(&self, id: &GcId) -> &GcVal {
        match &self.slots[id.0] {
            Some(val) => val,
            None => unreachable!("Dereferenced a handle to a freed object."),
        }
    }

    /// Gets a mutable reference into the `GcVal` associated with the given `GcId`.
    pub fn get_mut(&mut self, id: &GcId) -> &mut GcVal {
        match &mut self.slots[id.0] {
            Some(val) => val,
            None => unreachable!("Dereferenced a handle to a freed object."),
        }
    }

    /// The number of live objects in the table.
    pub fn object_count(&self) -> usize {
        self.slots.iter().filter(|slot| slot.is_some()).count()
    }

    /// The estimated number of live young-generation bytes.
    pub fn bytes_young(&self) -> usize {
        self.bytes_young
    }

    /// The estimated number of live old-generation bytes.
    pub fn bytes_old(&self) -> usize {
        self.bytes_old
    }

    /// Runs one collection cycle against the provided roots.
    ///
    /// The young generation is always collected. The old generation is
    /// additionally collected when its byte count has outgrown its
    /// threshold. When only the young generation is in scope, edges from
    /// old objects are not followed at all: a young object referenced
    /// only by an old one must also be reachable through a root to
    /// survive, because this collector carries no write barrier.
    pub fn collect(&mut self, roots: &Roots) {
        let collect_old = self.bytes_old > self.threshold_old;

        #[cfg(feature = "gc-log")]
        eprintln!(
            "[GC] begin cycle (scope: {}, young {} bytes, old {} bytes)",
            if collect_old { "young+old" } else { "young" },
            self.bytes_young,
            self.bytes_old
        );

        self.mark_roots(roots, collect_old);
        self.trace_references(collect_old);
        self.sweep(collect_old);

        self.threshold_young *= self.grow_young;
        self.threshold_old *= self.grow_old;

        #[cfg(feature = "gc-log")]
        eprintln!(
            "[GC] end cycle (young {} bytes, old {} bytes)",
            self.bytes_young, self.bytes_old
        );
    }

    /// Marks every object reachable directly from the interpreter's
    /// value stack and globals mapping.
    fn mark_roots(&mut self, roots: &Roots, collect_old: bool) {
        for value in roots.stack.iter() {
            self.mark_value(value, collect_old);
        }

        for value in roots.globals.values() {
            self.mark_value(value, collect_old);
        }
    }

    /// Marks the object behind a value, if the value holds one.
    fn mark_value(&mut self, value: &Value, collect_old: bool) {
        if let Value::Obj(id) = value {
            self.mark_object(*id, collect_old);
        }
    }

    /// Marks a single object and queues it for tracing. Objects outside
    /// the collection scope and objects already marked are skipped.
    fn mark_object(&mut self, id: GcId, collect_old: bool) {
        let slot = match &mut self.slots[id.0] {
            Some(val) => val,
            None => unreachable!("Marked a handle to a freed object."),
        };

        if !collect_old && slot.header.generation == Generation::Old {
            return;
        }

        if slot.header.marked {
            return;
        }

        slot.header.marked = true;
        self.gray.push(id);
    }

    /// Drains the gray worklist, marking the references going out of
    /// each gray object until every reachable object is black.
    fn trace_references(&mut self, collect_old: bool) {
        while let Some(id) = self.gray.pop() {
            // Gather the outgoing references first; marking children
            // mutates other table slots.
            let mut children: Vec<Value> = Vec::new();

            match &self.get(&id).obj {
                HeapObject::Str(_) | HeapObject::Allocation(_) => {}
                HeapObject::Function(f) => {
                    children.push(Value::Obj(f.name));
                    children.extend_from_slice(f.chunk.constants());
                }
                HeapObject::Class(c) => children.push(Value::Obj(c.name)),
                HeapObject::Instance(i) => {
                    children.push(Value::Obj(i.class));
                    children.extend(i.fields.values().copied());
                }
            }

            for child in children.iter() {
                self.mark_value(child, collect_old);
            }
        }
    }

    /// Frees every unmarked object in scope, clears the marks of the
    /// survivors, and promotes young survivors that have reached the
    /// promotion age.
    fn sweep(&mut self, collect_old: bool) {
        for idx in 0..self.slots.len() {
            let header = match &self.slots[idx] {
                Some(val) => val.header,
                None => continue,
            };

            match header.generation {
                Generation::Young => {
                    if header.marked {
                        let slot = self.slots[idx].as_mut().unwrap();
                        slot.header.marked = false;
                        slot.header.age += 1;

                        if slot.header.age >= PROMOTION_AGE {
                            slot.header.generation = Generation::Old;
                            self.bytes_young -= header.size;
                            self.bytes_old += header.size;

                            #[cfg(feature = "gc-log")]
                            eprintln!("[GC] promote slot {} ({} bytes)", idx, header.size);
                        }
                    } else {
                        self.free_slot(idx);
                    }
                }
                Generation::Old if collect_old => {
                    if header.marked {
                        self.slots[idx].as_mut().unwrap().header.marked = false;
                    } else {
                        self.free_slot(idx);
                    }
                }
                Generation::Old => {}
            }
        }
    }

    /// Releases a single slot and records it for reuse. Dropping the
    /// stored value releases everything the object owns, including an
    /// allocation's byte block and a function's chunk.
    fn free_slot(&mut self, idx: usize) {
        if let Some(val) = self.slots[idx].take() {
            match val.header.generation {
                Generation::Young => self.bytes_young -= val.header.size,
                Generation::Old => self.bytes_old -= val.header.size,
            }

            #[cfg(feature = "gc-log")]
            eprintln!(
                "[GC] free slot {} ({:?}, {} bytes)",
                idx,
                val.obj.kind(),
                val.header.size
            );

            self.tombstones.push(idx);
        }
    }
}

/// Estimates the footprint of an object: the fixed slot size plus the
/// variable content it owns. The estimate is recorded in the object's
/// header at allocation time and used symmetrically when the object is
/// freed or promoted, so the byte counters stay consistent even when
/// the object itself mutates afterwards.
fn object_size(obj: &HeapObject) -> usize {
    let base = std::mem::size_of::<GcVal>();

    match obj {
        HeapObject::Str(s) => base + s.text.len(),
        HeapObject::Function(f) => {
            base + f.chunk.len() + f.chunk.get_pool_size() * std::mem::size_of::<Value>()
        }
        HeapObject::Class(_) => base,
        HeapObject::Instance(_) => base,
        HeapObject::Allocation(a) => base + a.block.len(),
    }
}
